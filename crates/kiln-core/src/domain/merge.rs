//! Folding same-path contributions into one file.
//!
//! Application order for a path is `(priority asc, resolved position asc)`.
//! Capabilities missing from the resolved order sort after every known one,
//! by id. The outcome depends only on that order, never on the order of the
//! input slice.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::{
    entities::{CapabilityId, FileContribution, MergeStrategy},
    error::DomainError,
};

/// One output file produced from contributions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    pub path: String,
    pub content: String,
    pub strategy: MergeStrategy,
    /// In application order.
    pub contributors: Vec<CapabilityId>,
}

/// Merge every contribution, one [`MergedFile`] per path, sorted by path.
///
/// # Errors
///
/// - [`DomainError::MergeConflictAmbiguity`] when one path mixes strategies.
/// - [`DomainError::InvalidStructuredContent`] when a `merge-structured`
///   contribution is not JSON.
pub fn merge_contributions(
    contributions: &[FileContribution],
    order: &[CapabilityId],
) -> Result<Vec<MergedFile>, DomainError> {
    let position: HashMap<&CapabilityId, usize> =
        order.iter().enumerate().map(|(i, id)| (id, i)).collect();

    let mut by_path: BTreeMap<&str, Vec<&FileContribution>> = BTreeMap::new();
    for c in contributions {
        by_path.entry(c.path.as_str()).or_default().push(c);
    }

    by_path
        .into_iter()
        .map(|(path, mut group)| {
            group.sort_by(|a, b| {
                let pa = position.get(&a.plugin_id).copied().unwrap_or(usize::MAX);
                let pb = position.get(&b.plugin_id).copied().unwrap_or(usize::MAX);
                (a.priority, pa, &a.plugin_id, &a.content).cmp(&(
                    b.priority,
                    pb,
                    &b.plugin_id,
                    &b.content,
                ))
            });
            merge_group(path, &group)
        })
        .collect()
}

fn merge_group(path: &str, group: &[&FileContribution]) -> Result<MergedFile, DomainError> {
    let strategy = group[0].merge_strategy;
    if group.iter().any(|c| c.merge_strategy != strategy) {
        return Err(DomainError::MergeConflictAmbiguity {
            path: path.to_string(),
            strategies: group
                .iter()
                .map(|c| format!("{}:{}", c.plugin_id, c.merge_strategy))
                .collect(),
        });
    }

    let content = match strategy {
        MergeStrategy::Replace => group
            .last()
            .map(|c| c.content.clone())
            .unwrap_or_default(),
        MergeStrategy::Append => group
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        MergeStrategy::MergeStructured => merge_structured(path, group)?,
    };

    let mut contributors: Vec<CapabilityId> = Vec::with_capacity(group.len());
    for c in group {
        if !contributors.contains(&c.plugin_id) {
            contributors.push(c.plugin_id.clone());
        }
    }

    Ok(MergedFile {
        path: path.to_string(),
        content,
        strategy,
        contributors,
    })
}

fn merge_structured(path: &str, group: &[&FileContribution]) -> Result<String, DomainError> {
    let mut acc: Option<Value> = None;
    for c in group {
        let doc: Value =
            serde_json::from_str(&c.content).map_err(|e| DomainError::InvalidStructuredContent {
                plugin_id: c.plugin_id.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        acc = Some(match acc {
            Some(mut base) => {
                deep_merge(&mut base, doc);
                base
            }
            None => doc,
        });
    }

    let merged = acc.unwrap_or(Value::Object(serde_json::Map::new()));
    let mut out = serde_json::to_string_pretty(&merged).map_err(|e| {
        DomainError::InvalidStructuredContent {
            plugin_id: String::new(),
            path: path.to_string(),
            reason: e.to_string(),
        }
    })?;
    out.push('\n');
    Ok(out)
}

/// Objects merge key by key, arrays concatenate without duplicates, and
/// anything else is replaced by `overlay`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(overlay)) => {
            for item in overlay {
                if !base.contains(&item) {
                    base.push(item);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Reject two plain files at one path from different capabilities, and a
/// plain file sharing a path with a contribution.
///
/// `files` holds the rendered paths each capability will write.
///
/// # Errors
///
/// [`DomainError::PathCollision`] naming the first two producers.
pub fn detect_collisions<'a>(
    files: impl IntoIterator<Item = (&'a CapabilityId, &'a str)>,
    contributions: &[FileContribution],
) -> Result<(), DomainError> {
    let mut owners: HashMap<&str, &CapabilityId> = HashMap::new();
    for (owner, path) in files {
        if let Some(first) = owners.get(path) {
            if *first != owner {
                return Err(DomainError::PathCollision {
                    path: path.to_string(),
                    first: first.to_string(),
                    second: owner.to_string(),
                });
            }
        } else {
            owners.insert(path, owner);
        }
    }

    for c in contributions {
        if let Some(owner) = owners.get(c.path.as_str()) {
            return Err(DomainError::PathCollision {
                path: c.path.clone(),
                first: owner.to_string(),
                second: c.plugin_id.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(names: &[&str]) -> Vec<CapabilityId> {
        names.iter().map(|n| CapabilityId::from(*n)).collect()
    }

    fn contrib(plugin: &str, path: &str, content: &str, s: MergeStrategy) -> FileContribution {
        FileContribution::new(plugin, path, content, s)
    }

    #[test]
    fn replace_highest_priority_wins_regardless_of_input_order() {
        let order = ids(&["a", "b"]);
        let five = contrib("a", "f.txt", "five", MergeStrategy::Replace).priority(5);
        let zero = contrib("b", "f.txt", "zero", MergeStrategy::Replace);

        let forward = merge_contributions(&[zero.clone(), five.clone()], &order).unwrap();
        let reverse = merge_contributions(&[five, zero], &order).unwrap();
        assert_eq!(forward[0].content, "five");
        assert_eq!(forward, reverse);
    }

    #[test]
    fn replace_tie_goes_to_later_capability() {
        let order = ids(&["a", "b"]);
        let merged = merge_contributions(
            &[
                contrib("b", "f", "from-b", MergeStrategy::Replace),
                contrib("a", "f", "from-a", MergeStrategy::Replace),
            ],
            &order,
        )
        .unwrap();
        assert_eq!(merged[0].content, "from-b");
        assert_eq!(merged[0].contributors, ids(&["a", "b"]));
    }

    #[test]
    fn append_joins_in_application_order() {
        let order = ids(&["a", "b", "c"]);
        let merged = merge_contributions(
            &[
                contrib("c", "README.md", "three", MergeStrategy::Append),
                contrib("a", "README.md", "one", MergeStrategy::Append),
                contrib("b", "README.md", "zero", MergeStrategy::Append).priority(-1),
            ],
            &order,
        )
        .unwrap();
        assert_eq!(merged[0].content, "zero\none\nthree");
    }

    #[test]
    fn structured_deep_merges_and_dedupes_arrays() {
        let order = ids(&["base", "lint"]);
        let merged = merge_contributions(
            &[
                contrib(
                    "lint",
                    "package.json",
                    r#"{"scripts":{"lint":"eslint ."},"keywords":["a","b"],"private":false}"#,
                    MergeStrategy::MergeStructured,
                ),
                contrib(
                    "base",
                    "package.json",
                    r#"{"name":"demo","scripts":{"build":"tsc"},"keywords":["a"],"private":true}"#,
                    MergeStrategy::MergeStructured,
                ),
            ],
            &order,
        )
        .unwrap();

        let doc: Value = serde_json::from_str(&merged[0].content).unwrap();
        assert_eq!(
            doc,
            json!({
                "name": "demo",
                "scripts": { "build": "tsc", "lint": "eslint ." },
                "keywords": ["a", "b"],
                "private": false
            })
        );
        assert!(merged[0].content.ends_with("}\n"));
    }

    #[test]
    fn structured_rejects_non_json() {
        let err = merge_contributions(
            &[contrib("a", "p.json", "not json", MergeStrategy::MergeStructured)],
            &ids(&["a"]),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStructuredContent { plugin_id, .. } if plugin_id == "a"));
    }

    #[test]
    fn mixed_strategies_are_ambiguous() {
        let err = merge_contributions(
            &[
                contrib("a", "f", "x", MergeStrategy::Append),
                contrib("b", "f", "y", MergeStrategy::Replace),
            ],
            &ids(&["a", "b"]),
        )
        .unwrap_err();
        match err {
            DomainError::MergeConflictAmbiguity { path, strategies } => {
                assert_eq!(path, "f");
                assert_eq!(strategies, vec!["a:append", "b:replace"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_capabilities_sort_last() {
        let merged = merge_contributions(
            &[
                contrib("stranger", "f", "s", MergeStrategy::Append),
                contrib("a", "f", "a", MergeStrategy::Append),
            ],
            &ids(&["a"]),
        )
        .unwrap();
        assert_eq!(merged[0].content, "a\ns");
    }

    #[test]
    fn collisions_between_plain_files() {
        let a = CapabilityId::from("a");
        let b = CapabilityId::from("b");
        let err = detect_collisions(vec![(&a, "x.txt"), (&b, "x.txt")], &[]).unwrap_err();
        assert!(matches!(err, DomainError::PathCollision { first, second, .. } if first == "a" && second == "b"));

        assert!(detect_collisions(vec![(&a, "x.txt"), (&b, "y.txt")], &[]).is_ok());
    }

    #[test]
    fn collision_between_file_and_contribution() {
        let a = CapabilityId::from("a");
        let err = detect_collisions(
            vec![(&a, "README.md")],
            &[contrib("b", "README.md", "x", MergeStrategy::Append)],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::PathCollision { .. }));
    }
}
