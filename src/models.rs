//! Data models for the skip-list generator.
//!
//! This module contains the core data structures used throughout
//! the application for representing outcomes, package identities and
//! the skip lists produced at the end of a run.

use crate::errors::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome recorded by the experiment harness for one crate on one toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The crate did not compile
    BuildFail,
    /// The crate compiled but its test suite failed
    TestFail,
    /// The crate compiled and its tests passed
    TestPass,
    /// Tests were not run for this crate
    TestSkipped,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [
        Outcome::BuildFail,
        Outcome::TestFail,
        Outcome::TestPass,
        Outcome::TestSkipped,
    ];

    /// The literal written to `results.txt` by the harness.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::BuildFail => "build-fail",
            Outcome::TestFail => "test-fail",
            Outcome::TestPass => "test-pass",
            Outcome::TestSkipped => "test-skipped",
        }
    }

    /// Returns the skip flag for failing outcomes, `None` for passing ones.
    pub fn skip_kind(&self) -> Option<SkipKind> {
        match self {
            Outcome::BuildFail => Some(SkipKind::Skip),
            Outcome::TestFail => Some(SkipKind::SkipTests),
            Outcome::TestPass | Outcome::TestSkipped => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ParseError;

    /// Surrounding whitespace (usually a trailing newline) is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Outcome::ALL
            .into_iter()
            .find(|outcome| outcome.as_str() == trimmed)
            .ok_or_else(|| ParseError::InvalidOutcome(trimmed.to_string()))
    }
}

/// Where a tested crate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// A crates.io release, directory `reg`
    #[serde(rename = "reg")]
    Registry,
    /// A GitHub repository at some commit, directory `gh`
    #[serde(rename = "gh")]
    GitHub,
}

impl SourceKind {
    /// Directory name used by the harness for this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            SourceKind::Registry => "reg",
            SourceKind::GitHub => "gh",
        }
    }

    /// Separator between the logical name and the version or commit suffix.
    pub fn suffix_separator(&self) -> char {
        match self {
            SourceKind::Registry => '-',
            SourceKind::GitHub => '.',
        }
    }

    /// Strip the version (registry) or commit hash (GitHub) from a package token.
    ///
    /// Splits on the last separator; a token without one is returned whole.
    pub fn logical_name<'a>(&self, token: &'a str) -> &'a str {
        token
            .rsplit_once(self.suffix_separator())
            .map_or(token, |(name, _)| name)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for SourceKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reg" => Ok(SourceKind::Registry),
            "gh" => Ok(SourceKind::GitHub),
            other => Err(ParseError::UnknownSourceKind(other.to_string())),
        }
    }
}

/// Logical package identity shared by every version or commit of a crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageKey {
    pub kind: SourceKind,
    pub name: String,
}

impl PackageKey {
    pub fn new(kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.kind, self.name)
    }
}

/// Aggregated state of one logical package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Every observation so far had the same outcome.
    Consistent { outcome: Outcome, count: usize },
    /// Observations disagreed. Never left once entered.
    Ambiguous,
}

impl GroupState {
    /// State after the first observation of a package.
    pub fn first(outcome: Outcome) -> Self {
        GroupState::Consistent { outcome, count: 1 }
    }

    /// Fold one more observation into the state.
    pub fn observe(self, seen: Outcome) -> Self {
        match self {
            GroupState::Consistent { outcome, count } if outcome == seen => {
                GroupState::Consistent {
                    outcome,
                    count: count + 1,
                }
            }
            GroupState::Consistent { .. } | GroupState::Ambiguous => GroupState::Ambiguous,
        }
    }

    /// The outcome and count, or `None` when ambiguous.
    pub fn consistent(&self) -> Option<(Outcome, usize)> {
        match *self {
            GroupState::Consistent { outcome, count } => Some((outcome, count)),
            GroupState::Ambiguous => None,
        }
    }

    #[allow(dead_code)] // Convenience for callers matching on ambiguity only
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, GroupState::Ambiguous)
    }
}

/// Flag written into a skip-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipKind {
    /// Do not build the crate at all
    Skip,
    /// Build the crate but do not run its tests
    SkipTests,
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipKind::Skip => write!(f, "skip"),
            SkipKind::SkipTests => write!(f, "skip-tests"),
        }
    }
}

/// One entry of a rendered skip list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEntry {
    pub kind: SourceKind,
    /// Crate name, or `org/repo` for GitHub entries.
    pub name: String,
    pub skip: SkipKind,
}

impl SkipEntry {
    /// Render the entry as a line of crater configuration.
    ///
    /// GitHub slugs contain a `/` so they are quoted as TOML keys.
    pub fn to_config_line(&self) -> String {
        match self.kind {
            SourceKind::GitHub => format!("\"{}\" = {{ {} = true }}", self.name, self.skip),
            SourceKind::Registry => format!("{} = {{ {} = true }}", self.name, self.skip),
        }
    }
}

/// Why a consistently failing group did not make it into a skip list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedGroup {
    pub kind: SourceKind,
    pub name: String,
    pub reason: String,
}

/// Counters describing one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationStats {
    /// Number of distinct logical packages.
    pub groups: usize,
    /// Groups with mixed outcomes.
    pub ambiguous: usize,
    /// Groups that consistently passed or skipped tests.
    pub passing: usize,
    /// Failing groups whose count differed from the expected total.
    pub count_mismatch: usize,
}

/// Metadata about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the summary was produced.
    pub generated_at: DateTime<Utc>,
    /// Experiment root that was scanned.
    pub root: String,
    /// Number of experiment directories.
    pub experiments: usize,
    /// Observation count a group needs to be listed.
    pub expected_total: usize,
    /// Number of result entries that were aggregated.
    pub result_entries: usize,
}

/// Complete outcome of a run, serialized as the JSON summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    pub stats: ClassificationStats,
    /// Entries written to the GitHub skip list.
    pub github_entries: usize,
    /// Entries written to the registry skip list.
    pub registry_entries: usize,
    /// Failing groups dropped because their name could not be segmented.
    pub dropped: Vec<DroppedGroup>,
}
