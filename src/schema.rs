use crate::error::{ExporterError, Result};

/// Label present on every exported metric, holding the array's display name
pub const TARGET_LABEL: &str = "array";

/// Segment markers that expand over all children at that level of the tree
pub const WILDCARD_MARKERS: [&str; 2] = ["*", "+"];

/// Ordered label names for one metric, compiled from its path template
///
/// The first label is always the target label. Every wildcard segment in the
/// template contributes one further label, named after the segment directly
/// before it, in template order. A template without wildcards compiles to the
/// target label alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    labels: Vec<String>,
}

impl LabelSchema {
    /// Compile the label schema for a dot-delimited path template
    ///
    /// A wildcard in the first segment has no preceding segment to name its
    /// label after and is rejected.
    pub fn compile(path: &str) -> Result<Self> {
        let mut labels = vec![TARGET_LABEL.to_string()];

        let segments: Vec<&str> = path.split('.').collect();
        for (i, segment) in segments.iter().enumerate() {
            if WILDCARD_MARKERS.contains(segment) {
                if i == 0 {
                    return Err(ExporterError::Schema(format!(
                        "path template '{path}' starts with a wildcard"
                    )));
                }
                labels.push(segments[i - 1].to_string());
            }
        }

        Ok(Self { labels })
    }

    /// Label names in schema order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label names as borrowed slices, in schema order
    pub fn label_refs(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }

    /// Number of labels, counting the fixed target label
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false: the target label is unconditional
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
