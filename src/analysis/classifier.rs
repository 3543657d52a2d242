//! Selection of the packages that failed every time they were tested.

use super::aggregator::Groups;
use crate::models::{ClassificationStats, DroppedGroup, PackageKey, SkipEntry, SourceKind};
use tracing::debug;

/// Each experiment compares two toolchains.
pub const TOOLCHAINS_PER_EXPERIMENT: usize = 2;

/// Observations a group needs before it is considered to always fail.
///
/// A heuristic: crater sometimes tests several versions of a crate in one
/// experiment, so a group can legitimately exceed this. Only exact matches
/// qualify.
pub fn expected_total(experiments: usize) -> usize {
    TOOLCHAINS_PER_EXPERIMENT * experiments
}

/// Skip lists and bookkeeping produced by [`classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// GitHub entries, sorted by rendered line.
    pub github: Vec<SkipEntry>,
    /// Registry entries, sorted by rendered line.
    pub registry: Vec<SkipEntry>,
    /// Qualifying groups left out because their name could not be split.
    pub dropped: Vec<DroppedGroup>,
    pub stats: ClassificationStats,
}

impl Classification {
    pub fn github_lines(&self) -> Vec<String> {
        self.github.iter().map(SkipEntry::to_config_line).collect()
    }

    pub fn registry_lines(&self) -> Vec<String> {
        self.registry.iter().map(SkipEntry::to_config_line).collect()
    }
}

/// Pick the groups that consistently failed exactly `expected` times.
pub fn classify(groups: &Groups, expected: usize) -> Classification {
    let mut result = Classification::default();
    result.stats.groups = groups.len();

    for (key, state) in groups.iter() {
        let Some((outcome, count)) = state.consistent() else {
            result.stats.ambiguous += 1;
            continue;
        };

        let Some(skip) = outcome.skip_kind() else {
            result.stats.passing += 1;
            continue;
        };

        if count != expected {
            result.stats.count_mismatch += 1;
            continue;
        }

        match display_name(key) {
            Ok(name) => {
                let entry = SkipEntry {
                    kind: key.kind,
                    name,
                    skip,
                };
                match key.kind {
                    SourceKind::GitHub => result.github.push(entry),
                    SourceKind::Registry => result.registry.push(entry),
                }
            }
            Err(reason) => {
                // Usually a dot in a repo name or a pre-release version
                debug!("Dropping {}: {}", key, reason);
                result.dropped.push(DroppedGroup {
                    kind: key.kind,
                    name: key.name.clone(),
                    reason,
                });
            }
        }
    }

    result.github.sort_by_cached_key(SkipEntry::to_config_line);
    result.registry.sort_by_cached_key(SkipEntry::to_config_line);

    debug!(
        "Classified {} groups: {} github, {} registry, {} dropped",
        result.stats.groups,
        result.github.len(),
        result.registry.len(),
        result.dropped.len()
    );
    result
}

/// Name as written in crater's configuration, or why it can't be derived.
fn display_name(key: &PackageKey) -> Result<String, String> {
    match key.kind {
        SourceKind::GitHub => {
            let parts: Vec<&str> = key.name.split('.').collect();
            match parts.as_slice() {
                [org, repo] => Ok(format!("{}/{}", org, repo)),
                _ => Err(format!(
                    "ambiguous segmentation: expected <org>.<repo>, got {} dot-separated parts",
                    parts.len()
                )),
            }
        }
        SourceKind::Registry => {
            if key.name.contains('.') {
                Err("ambiguous segmentation: crate name contains a dot".to_string())
            } else {
                Ok(key.name.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate;
    use crate::models::SkipKind;

    fn groups(entries: &[(&str, &str)]) -> Groups {
        aggregate(entries.iter().copied()).unwrap()
    }

    #[test]
    fn test_expected_total() {
        assert_eq!(expected_total(0), 0);
        assert_eq!(expected_total(2), 4);
        assert_eq!(expected_total(7), 14);
    }

    #[test]
    fn test_only_exact_failing_counts_are_listed() {
        let groups = groups(&[
            ("a/res/x/reg/bar-0.1.0", "build-fail"),
            ("a/res/y/reg/bar-0.1.0", "build-fail"),
            ("a/res/x/reg/short-1.0.0", "build-fail"),
            ("a/res/x/reg/long-1.0.0", "test-fail"),
            ("a/res/y/reg/long-1.0.0", "test-fail"),
            ("a/res/x/reg/long-1.1.0", "test-fail"),
        ]);

        let result = classify(&groups, 2);
        assert_eq!(result.registry_lines(), vec!["bar = { skip = true }"]);
        assert_eq!(result.stats.count_mismatch, 2);
    }

    #[test]
    fn test_passing_groups_never_listed() {
        let groups = groups(&[
            ("a/res/x/reg/ok-1.0.0", "test-pass"),
            ("a/res/y/reg/ok-1.0.0", "test-pass"),
            ("a/res/x/reg/nt-1.0.0", "test-skipped"),
            ("a/res/y/reg/nt-1.0.0", "test-skipped"),
        ]);

        let result = classify(&groups, 2);
        assert!(result.registry.is_empty());
        assert_eq!(result.stats.passing, 2);
    }

    #[test]
    fn test_ambiguous_groups_never_listed() {
        let groups = groups(&[
            ("a/res/x/reg/foo-1.0.0", "build-fail"),
            ("a/res/y/reg/foo-2.0.0", "test-fail"),
        ]);

        let result = classify(&groups, 2);
        assert!(result.registry.is_empty());
        assert_eq!(result.stats.ambiguous, 1);
    }

    #[test]
    fn test_github_lines() {
        let groups = groups(&[
            ("a/res/x/gh/orgX.repoY.1111", "test-fail"),
            ("a/res/y/gh/orgX.repoY.2222", "test-fail"),
            ("a/res/x/gh/acme.widget.3333", "build-fail"),
            ("a/res/y/gh/acme.widget.3333", "build-fail"),
        ]);

        let result = classify(&groups, 2);
        assert_eq!(
            result.github_lines(),
            vec![
                "\"acme/widget\" = { skip = true }",
                "\"orgX/repoY\" = { skip-tests = true }",
            ]
        );
        assert_eq!(result.github[1].skip, SkipKind::SkipTests);
    }

    #[test]
    fn test_dotted_names_are_dropped() {
        let groups = groups(&[
            ("a/res/x/gh/org.repo.rs.1111", "build-fail"),
            ("a/res/y/gh/org.repo.rs.1111", "build-fail"),
            ("a/res/x/gh/lonely.1111", "build-fail"),
            ("a/res/y/gh/lonely.1111", "build-fail"),
            ("a/res/x/reg/pre-1.0.0-beta.1", "build-fail"),
            ("a/res/y/reg/pre-1.0.0-beta.1", "build-fail"),
        ]);

        let result = classify(&groups, 2);
        assert!(result.github.is_empty());
        assert!(result.registry.is_empty());

        let mut dropped: Vec<&str> = result.dropped.iter().map(|d| d.name.as_str()).collect();
        dropped.sort();
        assert_eq!(dropped, vec!["lonely", "org.repo.rs", "pre-1.0.0"]);
    }

    #[test]
    fn test_output_is_sorted_and_deterministic() {
        let entries = [
            ("a/res/x/reg/zeta-1.0.0", "build-fail"),
            ("a/res/x/reg/alpha-1.0.0", "test-fail"),
            ("a/res/x/reg/Mid-1.0.0", "build-fail"),
            ("a/res/x/reg/alpha_b-1.0.0", "build-fail"),
        ];

        let first = classify(&groups(&entries), 1).registry_lines();
        let mut reversed_entries = entries;
        reversed_entries.reverse();
        let second = classify(&groups(&reversed_entries), 1).registry_lines();

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);
        assert_eq!(first, second);
        assert_eq!(first[0], "Mid = { skip = true }");
    }
}
