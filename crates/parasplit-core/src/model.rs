//! Core value types shared by the resolver, partitioner and renderer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use parasplit_history::JobId;
use serde::{Deserialize, Serialize};

/// Estimated duration per test class, keyed by class identifier.
pub type Durations = BTreeMap<String, Duration>;

/// A test class and its estimated cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestClass {
    pub name: String,
    pub duration: Duration,
}

impl TestClass {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// How the number of groups is chosen.
///
/// Both variants carry a target group count, clamped to
/// `1..=ParallelismMode::MAX_GROUPS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "size", rename_all = "snake_case")]
pub enum ParallelismMode {
    /// `count(n)`: split into `n` groups.
    Count(usize),
    /// `time(n)`: split into `n` groups balanced by recorded duration.
    Time(usize),
}

impl ParallelismMode {
    /// Largest number of groups a split can be asked for.
    pub const MAX_GROUPS: usize = 1024;

    /// Number of groups to produce, within `1..=MAX_GROUPS`.
    pub fn group_count(&self) -> usize {
        match *self {
            ParallelismMode::Count(n) | ParallelismMode::Time(n) => n.clamp(1, Self::MAX_GROUPS),
        }
    }
}

impl fmt::Display for ParallelismMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParallelismMode::Count(n) => write!(f, "count({n})"),
            ParallelismMode::Time(n) => write!(f, "time({n})"),
        }
    }
}

/// Error returned when a parallelism string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid parallelism {input:?}: expected count(N), time(N), count:N or time:N with N <= 1024")]
pub struct ParseParallelismError {
    input: String,
}

impl FromStr for ParallelismMode {
    type Err = ParseParallelismError;

    /// Accepts `count(2)`, `time(3)`, `count:2` and `time:3`.
    ///
    /// Non-positive sizes are accepted and clamped to 1; sizes above
    /// `MAX_GROUPS` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseParallelismError {
            input: s.to_string(),
        };
        let trimmed = s.trim();
        let (kind, size) = if let Some(rest) = trimmed.strip_suffix(')') {
            rest.split_once('(').ok_or_else(err)?
        } else {
            trimmed.split_once(':').ok_or_else(err)?
        };

        let size: i64 = size.trim().parse().map_err(|_| err())?;
        let size = usize::try_from(size.max(1)).map_err(|_| err())?;
        if size > Self::MAX_GROUPS {
            return Err(err());
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(ParallelismMode::Count(size)),
            "time" => Ok(ParallelismMode::Time(size)),
            _ => Err(err()),
        }
    }
}

/// One group of test classes for a single executor.
///
/// With `includes = true`, `list` names the classes this group runs. With
/// `includes = false`, the group runs everything except `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub includes: bool,
    pub list: Vec<String>,
}

impl Split {
    pub fn inclusion(list: Vec<String>) -> Self {
        Self {
            includes: true,
            list,
        }
    }

    pub fn exclusion(list: Vec<String>) -> Self {
        Self {
            includes: false,
            list,
        }
    }

    /// The undivided split: run everything.
    pub fn everything() -> Self {
        Self::exclusion(Vec::new())
    }
}

/// A prior build whose test report seeds the partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildReference {
    pub job: JobId,
    pub number: u64,
}

impl BuildReference {
    pub fn new(job: JobId, number: u64) -> Self {
        Self { job, number }
    }
}

impl fmt::Display for BuildReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.job, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_spellings() {
        assert_eq!("count(5)".parse(), Ok(ParallelismMode::Count(5)));
        assert_eq!("time(3)".parse(), Ok(ParallelismMode::Time(3)));
        assert_eq!("count:2".parse(), Ok(ParallelismMode::Count(2)));
        assert_eq!(" TIME : 4 ".parse(), Ok(ParallelismMode::Time(4)));
    }

    #[test]
    fn non_positive_sizes_clamp_to_one() {
        assert_eq!("count(0)".parse(), Ok(ParallelismMode::Count(1)));
        assert_eq!("time(-7)".parse(), Ok(ParallelismMode::Time(1)));
        assert_eq!(ParallelismMode::Count(0).group_count(), 1);
    }

    #[test]
    fn group_count_is_bounded() {
        let max = ParallelismMode::MAX_GROUPS;
        assert_eq!(format!("count({max})").parse(), Ok(ParallelismMode::Count(max)));
        assert!(format!("count({})", max + 1).parse::<ParallelismMode>().is_err());
        assert!("count(99999999999)".parse::<ParallelismMode>().is_err());
        assert!("time:99999999999999999999".parse::<ParallelismMode>().is_err());
        assert_eq!(ParallelismMode::Count(usize::MAX).group_count(), max);
        assert_eq!(ParallelismMode::Time(max + 1).group_count(), max);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "count", "count()", "size(2)", "count(two)", "2"] {
            assert!(bad.parse::<ParallelismMode>().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        let mode = ParallelismMode::Time(3);
        assert_eq!(mode.to_string(), "time(3)");
        assert_eq!(mode.to_string().parse(), Ok(mode));
    }

    #[test]
    fn build_reference_display() {
        let reference = BuildReference::new(JobId::new("p/primary-branch").unwrap(), 2);
        assert_eq!(reference.to_string(), "p/primary-branch #2");
    }
}
