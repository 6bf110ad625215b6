use log::warn;
use serde_json::{Map, Value};

/// One collected measurement: label values in schema order plus the reading
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<String>,
    pub value: f64,
}

/// Flatten a nested result tree into samples
///
/// Every key at the current level extends a copy of the accumulated label
/// values, so sibling branches never observe each other's keys. Object values
/// recurse one level deeper; everything else is a leaf. String leaves are
/// parsed as floats and skipped with a warning when they do not parse;
/// non-numeric leaves are recorded as zero.
pub fn flatten_tree(tree: &Map<String, Value>, base_labels: &[String]) -> Vec<Sample> {
    let mut samples = Vec::new();
    flatten_into(tree, base_labels, &mut samples);
    samples
}

fn flatten_into(tree: &Map<String, Value>, base_labels: &[String], samples: &mut Vec<Sample>) {
    for (key, value) in tree {
        let mut labels = base_labels.to_vec();
        labels.push(key.clone());

        match value {
            Value::Object(child) => flatten_into(child, &labels, samples),
            Value::Number(n) => match n.as_f64() {
                Some(v) => samples.push(Sample { labels, value: v }),
                None => warn!("Numeric value {n} at {labels:?} has no float representation"),
            },
            Value::String(s) => match s.parse::<f64>() {
                Ok(v) => samples.push(Sample { labels, value: v }),
                Err(_) => warn!("Skipping unparsable value '{s}' at {labels:?}"),
            },
            other => {
                warn!("Unexpected leaf {other} at {labels:?}, recording zero");
                samples.push(Sample { labels, value: 0.0 });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn base() -> Vec<String> {
        vec!["unity01".to_string()]
    }

    #[test]
    fn test_one_sample_per_leaf() {
        let tree = tree(json!({
            "spa": {"eth0": 1.0, "eth1": 2.0},
            "spb": {"eth0": 3.0},
        }));
        let samples = flatten_tree(&tree, &base());
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_sibling_branches_do_not_share_labels() {
        let tree = tree(json!({
            "spa": {"0": 1.5},
            "spb": {"1": 2.5},
        }));
        let samples = flatten_tree(&tree, &base());
        assert!(samples.contains(&Sample {
            labels: vec!["unity01".into(), "spa".into(), "0".into()],
            value: 1.5,
        }));
        assert!(samples.contains(&Sample {
            labels: vec!["unity01".into(), "spb".into(), "1".into()],
            value: 2.5,
        }));
        // No cross-branch tuple may exist
        assert!(!samples.iter().any(|s| s.labels.contains(&"spa".to_string())
            && s.labels.contains(&"1".to_string())));
    }

    #[test]
    fn test_integer_leaves_are_recorded() {
        let tree = tree(json!({"spa": 10, "spb": -4, "spc": 18446744073709551615u64}));
        let samples = flatten_tree(&tree, &base());
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().any(|s| s.value == 10.0));
        assert!(samples.iter().any(|s| s.value == -4.0));
    }

    #[test]
    fn test_string_leaves_parse_or_skip() {
        let tree = tree(json!({"spa": "1.5", "spb": "N/A", "spc": "2e3"}));
        let samples = flatten_tree(&tree, &base());
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().any(|s| s.value == 1.5));
        assert!(samples.iter().any(|s| s.value == 2000.0));
        assert!(!samples.iter().any(|s| s.labels.last() == Some(&"spb".to_string())));
    }

    #[test]
    fn test_non_numeric_leaves_record_zero() {
        let tree = tree(json!({"spa": true, "spb": null}));
        let samples = flatten_tree(&tree, &base());
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.value == 0.0));
    }

    #[test]
    fn test_label_depth_tracks_nesting_depth() {
        let tree = tree(json!({
            "spa": {"eth0": {"rx": 7.0}},
        }));
        let samples = flatten_tree(&tree, &base());
        assert_eq!(samples.len(), 1);
        assert_eq!(
            samples[0].labels,
            vec![
                "unity01".to_string(),
                "spa".to_string(),
                "eth0".to_string(),
                "rx".to_string()
            ]
        );
    }

    #[test]
    fn test_flattening_is_deterministic() {
        let value = json!({
            "spb": {"eth1": 2.0, "eth0": 1.0},
            "spa": {"eth0": 0.5},
        });
        let first = flatten_tree(&tree(value.clone()), &base());
        let second = flatten_tree(&tree(value), &base());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_tree_yields_no_samples() {
        let samples = flatten_tree(&Map::new(), &base());
        assert!(samples.is_empty());
    }
}
