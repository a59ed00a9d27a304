//! Storage trait definitions for Parasplit
//!
//! These types define the build-history abstraction the split engine reads:
//! - `JobRecord`: a job, optionally a branch of a multi-branch project
//! - `BuildRecord`: one numbered build of a job
//! - `TestReport`: the test results archived with a completed build
//! - `BuildHistory`: read access to all of the above
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module, and `FsBuildArchive` stores history
//! on disk.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Full name of a job, as slash-separated path segments.
///
/// Branch jobs of a multi-branch project live one level below the project,
/// e.g. `p/some-branch` belongs to project `p`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Parse a full job name. Rejects empty segments and `.`/`..`.
    pub fn new(name: impl Into<String>) -> StorageResult<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .split('/')
                .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
        if !valid {
            return Err(StorageError::InvalidJobName { name });
        }
        Ok(JobId(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent path of this job, `None` for top-level jobs.
    pub fn project(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl TryFrom<String> for JobId {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        JobId::new(s)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::str::FromStr for JobId {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        JobId::new(s)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A job known to the build history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    /// Set on the branch job that indexing identified as the primary branch
    #[serde(default)]
    pub primary: bool,
}

impl JobRecord {
    pub fn new(id: JobId) -> Self {
        Self { id, primary: false }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Multi-branch project this job belongs to, if any.
    pub fn project(&self) -> Option<&str> {
        self.id.project()
    }
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

/// Outcome of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Running,
    Success,
    Unstable,
    Failure,
    Aborted,
}

impl BuildStatus {
    /// Whether the build has finished (in any state).
    pub fn is_completed(&self) -> bool {
        !matches!(self, BuildStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Running => "running",
            BuildStatus::Success => "success",
            BuildStatus::Unstable => "unstable",
            BuildStatus::Failure => "failure",
            BuildStatus::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "running" => Ok(BuildStatus::Running),
            "success" => Ok(BuildStatus::Success),
            "unstable" => Ok(BuildStatus::Unstable),
            "failure" => Ok(BuildStatus::Failure),
            "aborted" => Ok(BuildStatus::Aborted),
            other => Err(format!("unknown build status: {other}")),
        }
    }
}

/// One numbered build of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub job: JobId,
    pub number: u64,
    pub status: BuildStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BuildRecord {
    /// A finished build, stamped now.
    pub fn completed(job: JobId, number: u64, status: BuildStatus) -> Self {
        let completed_at = status.is_completed().then(Utc::now);
        Self {
            job,
            number,
            status,
            completed_at,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

impl std::fmt::Display for BuildRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.job, self.number)
    }
}

// ---------------------------------------------------------------------------
// Test reports
// ---------------------------------------------------------------------------

/// A single executed test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// Class (or module path) that declares the test
    pub class_name: String,
    /// Test name within the class
    pub name: String,
    /// Wall-clock time in seconds
    #[serde(default)]
    pub duration_secs: f64,
}

/// A group of test cases, typically one report file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub name: String,
    #[serde(default)]
    pub cases: Vec<TestCaseResult>,
}

/// Test results archived with a build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    #[serde(default)]
    pub suites: Vec<TestSuiteResult>,
}

impl TestReport {
    /// Total duration per class, summed over all of its cases.
    ///
    /// Negative, NaN and infinite case durations count as zero.
    pub fn class_durations(&self) -> BTreeMap<String, Duration> {
        let mut totals: BTreeMap<String, Duration> = BTreeMap::new();
        for case in self.suites.iter().flat_map(|s| s.cases.iter()) {
            let d = Duration::try_from_secs_f64(case.duration_secs).unwrap_or(Duration::ZERO);
            let entry = totals.entry(case.class_name.clone()).or_default();
            *entry = entry.saturating_add(d);
        }
        totals
    }
}

// ---------------------------------------------------------------------------
// BuildHistory
// ---------------------------------------------------------------------------

/// Read access to jobs, their builds and archived test reports.
///
/// Guarantees:
/// - `builds` returns builds newest first (descending `number`).
/// - `test_report` returns `Ok(None)` when a build archived no report, and an
///   error only when a report exists but cannot be read.
/// - Implementations never mutate history through this trait.
#[async_trait]
pub trait BuildHistory: Send + Sync {
    /// Look up a job. `Ok(None)` when it is unknown.
    async fn job(&self, job: &JobId) -> StorageResult<Option<JobRecord>>;

    /// All jobs directly below the given project path.
    async fn jobs_in_project(&self, project: &str) -> StorageResult<Vec<JobRecord>>;

    /// All builds of a job, newest first. Empty for unknown jobs.
    async fn builds(&self, job: &JobId) -> StorageResult<Vec<BuildRecord>>;

    /// The test report archived with a build, if any.
    async fn test_report(&self, job: &JobId, number: u64) -> StorageResult<Option<TestReport>>;
}
