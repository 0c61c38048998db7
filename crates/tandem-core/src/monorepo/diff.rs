//! Structural diff of package manifests as JSON Patch operations

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Paths that do not affect what consumers of a package receive
static DEV_ONLY_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(devDependencies|publishConfig)(/|$)").expect("Invalid regex")
});

/// One JSON Patch (RFC 6902) operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
}

impl PatchOperation {
    /// JSON Pointer the operation applies to
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Remove { path } | Self::Replace { path, .. } => path,
        }
    }
}

/// Operations that turn `old` into `new`
pub fn manifest_diff(old: &Value, new: &Value) -> Vec<PatchOperation> {
    let mut ops = Vec::new();
    diff_into(old, new, "", &mut ops);
    ops
}

/// Whether every operation touches only dev-only sections
pub fn is_dev_only_change(ops: &[PatchOperation]) -> bool {
    ops.iter().all(|op| DEV_ONLY_PATH.is_match(op.path()))
}

fn diff_into(old: &Value, new: &Value, pointer: &str, ops: &mut Vec<PatchOperation>) {
    match (old, new) {
        (Value::Object(before), Value::Object(after)) => {
            for (key, value) in before {
                let path = format!("{}/{}", pointer, escape(key));
                match after.get(key) {
                    Some(next) => diff_into(value, next, &path, ops),
                    None => ops.push(PatchOperation::Remove { path }),
                }
            }
            for (key, value) in after {
                if !before.contains_key(key) {
                    ops.push(PatchOperation::Add {
                        path: format!("{}/{}", pointer, escape(key)),
                        value: value.clone(),
                    });
                }
            }
        }
        (Value::Array(before), Value::Array(after)) => {
            for (i, (value, next)) in before.iter().zip(after).enumerate() {
                diff_into(value, next, &format!("{}/{}", pointer, i), ops);
            }
            for (i, value) in after.iter().enumerate().skip(before.len()) {
                ops.push(PatchOperation::Add {
                    path: format!("{}/{}", pointer, i),
                    value: value.clone(),
                });
            }
            for i in (after.len()..before.len()).rev() {
                ops.push(PatchOperation::Remove {
                    path: format!("{}/{}", pointer, i),
                });
            }
        }
        _ if old != new => ops.push(PatchOperation::Replace {
            path: pointer.to_string(),
            value: new.clone(),
        }),
        _ => {}
    }
}

/// Escape a key for use in a JSON Pointer
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_manifests() {
        let manifest = json!({"name": "a", "version": "1.0.0"});
        assert!(manifest_diff(&manifest, &manifest).is_empty());
    }

    #[test]
    fn test_diff_operations() {
        let old = json!({"name": "a", "version": "1.0.0", "keywords": ["x", "y"], "main": "index.js"});
        let new = json!({"name": "a", "version": "1.1.0", "keywords": ["x"], "types": "index.d.ts"});

        let ops = manifest_diff(&old, &new);
        assert_eq!(
            ops,
            vec![
                PatchOperation::Remove {
                    path: "/keywords/1".to_string()
                },
                PatchOperation::Remove {
                    path: "/main".to_string()
                },
                PatchOperation::Replace {
                    path: "/version".to_string(),
                    value: json!("1.1.0")
                },
                PatchOperation::Add {
                    path: "/types".to_string(),
                    value: json!("index.d.ts")
                },
            ]
        );
    }

    #[test]
    fn test_pointer_escaping() {
        let old = json!({"devDependencies": {"@scope/pkg": "^1.0.0"}});
        let new = json!({"devDependencies": {"@scope/pkg": "^2.0.0", "a~b": "1.0.0"}});

        let paths: Vec<String> = manifest_diff(&old, &new)
            .iter()
            .map(|op| op.path().to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["/devDependencies/@scope~1pkg", "/devDependencies/a~0b"]
        );
    }

    #[test]
    fn test_dev_only_change() {
        let old = json!({"name": "a", "devDependencies": {"jest": "^28.0.0"}});
        let dev = json!({"name": "a", "devDependencies": {"jest": "^29.0.0"}, "publishConfig": {"access": "public"}});
        let runtime = json!({"name": "a", "devDependencies": {"jest": "^29.0.0"}, "dependencies": {"x": "1"}});

        assert!(is_dev_only_change(&manifest_diff(&old, &dev)));
        assert!(!is_dev_only_change(&manifest_diff(&old, &runtime)));
    }

    #[test]
    fn test_dev_prefix_must_be_whole_key() {
        let ops = vec![PatchOperation::Add {
            path: "/devDependenciesMeta".to_string(),
            value: json!({}),
        }];
        assert!(!is_dev_only_change(&ops));
    }

    #[test]
    fn test_serialized_form() {
        let op = PatchOperation::Remove {
            path: "/main".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "remove", "path": "/main"})
        );
    }
}
