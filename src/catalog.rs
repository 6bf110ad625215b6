use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{ExporterError, Result};
use crate::schema::LabelSchema;

/// Immutable definition of one array metric
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricDescriptor {
    /// Symbolic name, also the base of the exposition family name
    pub name: String,
    /// Dot-delimited path template into the array's metric namespace
    pub path: String,
    /// Human-readable description, used as the exposition help text
    #[serde(default)]
    pub description: String,
    /// Unit of measure, appended to the exposition name when non-empty
    #[serde(default)]
    pub unit: String,
    /// Whether the metric answers one-shot point-in-time queries
    #[serde(default)]
    pub point_in_time: bool,
    /// Whether the metric is sampled through batched continuous queries
    #[serde(default)]
    pub continuous: bool,
}

impl MetricDescriptor {
    /// Compile the label schema for this descriptor's path template
    pub fn schema(&self) -> Result<LabelSchema> {
        LabelSchema::compile(&self.path)
            .map_err(|e| ExporterError::Catalog(format!("metric '{}': {}", self.name, e)))
    }

    /// Exposition family name: the sanitised name plus unit suffix
    pub fn family_name(&self) -> String {
        if self.unit.is_empty() {
            sanitise(&self.name)
        } else {
            format!("{}_{}", sanitise(&self.name), sanitise(&self.unit))
        }
    }

    /// Help text for the exposition family, never empty
    pub fn help_text(&self) -> String {
        if self.description.is_empty() {
            format!("Array metric {}", self.path)
        } else {
            self.description.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    metrics: Vec<MetricDescriptor>,
}

/// Load the metric catalog from a JSON file
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<MetricDescriptor>> {
    let path = path.as_ref();
    debug!("Loading metric catalog from: {}", path.display());

    let raw = fs::read_to_string(path)?;
    let catalog: CatalogFile = serde_json::from_str(&raw)
        .map_err(|e| ExporterError::Catalog(format!("{}: {}", path.display(), e)))?;

    debug!("Catalog holds {} metric definitions", catalog.metrics.len());
    Ok(catalog.metrics)
}

/// Resolve configured metric names against the catalog, preserving order
///
/// Unknown names and templates that fail schema compilation are surfaced
/// here so they fail at startup rather than on the first collect cycle.
pub fn select_metrics(
    catalog: &[MetricDescriptor],
    names: &[String],
) -> Result<Vec<MetricDescriptor>> {
    let mut selected = Vec::with_capacity(names.len());

    for name in names {
        let descriptor = catalog.iter().find(|m| &m.name == name).ok_or_else(|| {
            ExporterError::Config(format!("unknown metric '{name}' in selection"))
        })?;

        descriptor.schema()?;
        selected.push(descriptor.clone());
    }

    Ok(selected)
}

/// Reduce a name or unit fragment to exposition-safe characters
///
/// Slashes become "_per_" so rate units stay readable; anything else outside
/// [a-z0-9_] is replaced with an underscore and runs are collapsed.
fn sanitise(fragment: &str) -> String {
    let mut replaced = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        match c {
            'a'..='z' | '0'..='9' | '_' => replaced.push(c),
            'A'..='Z' => replaced.push(c.to_ascii_lowercase()),
            '/' => replaced.push_str("_per_"),
            '%' => replaced.push_str("percent"),
            _ => replaced.push('_'),
        }
    }

    let mut collapsed = String::with_capacity(replaced.len());
    let mut last_was_underscore = false;
    for c in replaced.chars() {
        if c == '_' {
            if !last_was_underscore {
                collapsed.push(c);
            }
            last_was_underscore = true;
        } else {
            collapsed.push(c);
            last_was_underscore = false;
        }
    }

    collapsed.trim_matches('_').to_string()
}
