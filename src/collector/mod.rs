mod cycle;
mod scheduler;

// Re-export public items
pub use cycle::{CollectorOptions, CycleOutcome, TargetCollector};
pub use scheduler::CollectionScheduler;
