//! Grouping of raw results by logical package.
//!
//! Every version of a registry crate and every commit of a GitHub repository
//! collapses into one group. A group remembers the single outcome it has seen
//! and how often, or that its outcomes disagreed.

use crate::errors::ParseError;
use crate::models::{GroupState, Outcome, PackageKey, SourceKind};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// The identifying segments at the end of a result directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub kind: SourceKind,
    /// Package token, e.g. `effect-monad-0.3.1` or `org.repo.<sha>`.
    pub token: String,
}

impl ParsedPath {
    /// Name shared by all versions or commits of this package.
    pub fn logical_name(&self) -> &str {
        self.kind.logical_name(&self.token)
    }

    pub fn key(&self) -> PackageKey {
        PackageKey::new(self.kind, self.logical_name())
    }
}

/// Parse `.../<source-kind>/<package-token>` from a result directory.
pub fn parse_result_dir(dir: &str) -> Result<ParsedPath, ParseError> {
    let path = Path::new(dir);
    let malformed = || ParseError::MalformedPath(dir.to_string());

    let token = path.file_name().and_then(|n| n.to_str()).ok_or_else(malformed)?;
    let kind = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .ok_or_else(malformed)?;

    Ok(ParsedPath {
        kind: kind.parse::<SourceKind>()?,
        token: token.to_string(),
    })
}

/// Aggregated state of every logical package seen in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups {
    states: BTreeMap<PackageKey, GroupState>,
    entries: usize,
}

impl Groups {
    /// Fold one observation in, returning the updated groups.
    pub fn observe(mut self, key: PackageKey, outcome: Outcome) -> Self {
        let next = match self.states.get(&key) {
            None => GroupState::first(outcome),
            Some(state) => state.observe(outcome),
        };
        self.states.insert(key, next);
        self.entries += 1;
        self
    }

    #[allow(dead_code)] // Lookup of a single group
    pub fn get(&self, key: &PackageKey) -> Option<GroupState> {
        self.states.get(key).copied()
    }

    /// Groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&PackageKey, &GroupState)> {
        self.states.iter()
    }

    /// Number of distinct packages.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Number of observations folded in.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

/// Parse and group `(result directory, result text)` entries.
///
/// Fails on the first entry with an unknown outcome or source kind.
pub fn aggregate<I, K, V>(results: I) -> Result<Groups>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let groups = results
        .into_iter()
        .try_fold(Groups::default(), |groups, (dir, text)| {
            let dir = dir.as_ref();
            let outcome = text
                .as_ref()
                .parse::<Outcome>()
                .with_context(|| format!("Invalid result in {}", dir))?;
            let parsed =
                parse_result_dir(dir).with_context(|| format!("Invalid result directory {}", dir))?;
            Ok::<_, anyhow::Error>(groups.observe(parsed.key(), outcome))
        })?;

    debug!(
        "Aggregated {} results into {} groups",
        groups.entries(),
        groups.len()
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_dir_registry() {
        let parsed = parse_result_dir("work/ex/ex1/res/stable/reg/effect-monad-0.3.1").unwrap();
        assert_eq!(parsed.kind, SourceKind::Registry);
        assert_eq!(parsed.token, "effect-monad-0.3.1");
        assert_eq!(parsed.logical_name(), "effect-monad");
    }

    #[test]
    fn test_parse_result_dir_github() {
        let parsed = parse_result_dir(
            "work/ex/ex1/res/beta/gh/pepyakin.chipster.9cd0c41e16b8e1a58381b3fb18ed412c92237f4e",
        )
        .unwrap();
        assert_eq!(parsed.kind, SourceKind::GitHub);
        assert_eq!(parsed.key(), PackageKey::new(SourceKind::GitHub, "pepyakin.chipster"));
    }

    #[test]
    fn test_parse_result_dir_unknown_kind() {
        let err = parse_result_dir("work/ex/ex1/res/stable/local/foo").unwrap_err();
        assert_eq!(err, ParseError::UnknownSourceKind("local".to_string()));
    }

    #[test]
    fn test_parse_result_dir_too_short() {
        assert!(matches!(
            parse_result_dir("foo-1.0.0"),
            Err(ParseError::MalformedPath(_))
        ));
        assert!(matches!(parse_result_dir(""), Err(ParseError::MalformedPath(_))));
    }

    #[test]
    fn test_aggregate_counts_consistent_outcomes() {
        let groups = aggregate(vec![
            ("ex1/res/a/reg/foo-1.0.0", "build-fail"),
            ("ex1/res/b/reg/foo-1.0.0", "build-fail\n"),
            ("ex2/res/a/reg/foo-1.1.0", "build-fail"),
        ])
        .unwrap();

        let key = PackageKey::new(SourceKind::Registry, "foo");
        assert_eq!(
            groups.get(&key),
            Some(GroupState::Consistent {
                outcome: Outcome::BuildFail,
                count: 3
            })
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.entries(), 3);
    }

    #[test]
    fn test_aggregate_mixed_outcomes_are_ambiguous() {
        let groups = aggregate(vec![
            ("ex1/res/a/reg/foo-1.0.0", "build-fail"),
            ("ex1/res/a/reg/foo-2.0.0", "test-pass"),
            ("ex2/res/a/reg/foo-1.0.0", "build-fail"),
            ("ex2/res/b/reg/foo-1.0.0", "build-fail"),
        ])
        .unwrap();

        let key = PackageKey::new(SourceKind::Registry, "foo");
        assert_eq!(groups.get(&key), Some(GroupState::Ambiguous));
    }

    #[test]
    fn test_aggregate_keeps_kinds_apart() {
        let groups = aggregate(vec![
            ("ex1/res/a/reg/serde-1.0.0", "build-fail"),
            ("ex1/res/a/gh/serde.abc123", "test-pass"),
        ])
        .unwrap();

        assert_eq!(groups.len(), 2);
        assert!(groups
            .get(&PackageKey::new(SourceKind::Registry, "serde"))
            .unwrap()
            .consistent()
            .is_some());
        assert!(groups
            .get(&PackageKey::new(SourceKind::GitHub, "serde"))
            .unwrap()
            .consistent()
            .is_some());
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let entries = vec![
            ("ex1/res/a/reg/foo-1.0.0", "build-fail"),
            ("ex1/res/b/reg/foo-1.0.0", "test-fail"),
            ("ex2/res/a/reg/foo-1.0.0", "build-fail"),
            ("ex1/res/a/reg/bar-0.1.0", "test-fail"),
            ("ex2/res/a/reg/bar-0.1.0", "test-fail"),
            ("ex1/res/a/gh/o.r.1", "test-pass"),
        ];

        let forward = aggregate(entries.clone()).unwrap();
        let reversed = aggregate(entries.iter().rev().cloned()).unwrap();
        let mut rotated = entries.clone();
        rotated.rotate_left(2);
        let rotated = aggregate(rotated).unwrap();

        assert_eq!(forward, reversed);
        assert_eq!(forward, rotated);
    }

    #[test]
    fn test_aggregate_rejects_bad_outcome() {
        let err = aggregate(vec![("ex1/res/a/reg/foo-1.0.0", "error")]).unwrap_err();
        assert!(format!("{:#}", err).contains("ex1/res/a/reg/foo-1.0.0"));
        assert!(err
            .chain()
            .any(|cause| cause.downcast_ref::<ParseError>().is_some()));
    }

    #[test]
    fn test_aggregate_rejects_bad_kind() {
        let err = aggregate(vec![("ex1/res/a/local/foo", "build-fail")]).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown source kind 'local'"));
    }
}
