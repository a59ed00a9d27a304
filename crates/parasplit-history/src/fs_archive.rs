//! Filesystem-backed build archive.
//!
//! Layout mirrors the job tree, with every path segment nested under `jobs/`:
//!
//! ```text
//! <root>/jobs/p/job.json
//! <root>/jobs/p/jobs/some-branch/job.json
//! <root>/jobs/p/jobs/some-branch/builds/2/build.json
//! <root>/jobs/p/jobs/some-branch/builds/2/test-report.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage_traits::*;

const JOB_FILE: &str = "job.json";
const BUILD_FILE: &str = "build.json";
const REPORT_FILE: &str = "test-report.json";

/// Build history stored as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBuildArchive {
    root: PathBuf,
}

impl FsBuildArchive {
    /// Open (and create if needed) an archive rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("jobs"))?;
        Ok(Self { root })
    }

    fn node_dir(&self, path: &str) -> PathBuf {
        path.split('/')
            .fold(self.root.clone(), |dir, seg| dir.join("jobs").join(seg))
    }

    fn build_dir(&self, job: &JobId, number: u64) -> PathBuf {
        self.node_dir(job.as_str())
            .join("builds")
            .join(number.to_string())
    }

    /// Create or update a job record.
    pub fn register_job(&self, record: &JobRecord) -> StorageResult<()> {
        let dir = self.node_dir(record.id.as_str());
        write_json_atomic(&dir, JOB_FILE, record)
    }

    /// Store a build, and its test report when one is given.
    ///
    /// The job must already be registered.
    pub fn record_build(&self, build: &BuildRecord, report: Option<&TestReport>) -> StorageResult<()> {
        if !self.node_dir(build.job.as_str()).join(JOB_FILE).is_file() {
            return Err(StorageError::JobNotFound {
                job: build.job.to_string(),
            });
        }
        let dir = self.build_dir(&build.job, build.number);
        write_json_atomic(&dir, BUILD_FILE, build)?;
        if let Some(report) = report {
            write_json_atomic(&dir, REPORT_FILE, report)?;
        }
        debug!(build = %build, has_report = report.is_some(), "Recorded build");
        Ok(())
    }
}

fn write_json_atomic<T: Serialize>(dir: &Path, file: &str, value: &T) -> StorageResult<()> {
    std::fs::create_dir_all(dir)?;
    let bytes = serde_json::to_vec_pretty(value)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.persist(dir.join(file)).map_err(|e| e.error)?;
    Ok(())
}

/// Read and decode a JSON file; `Ok(None)` if it does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::Io(e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StorageError::MalformedReport {
            location: path.display().to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl BuildHistory for FsBuildArchive {
    async fn job(&self, job: &JobId) -> StorageResult<Option<JobRecord>> {
        read_json(&self.node_dir(job.as_str()).join(JOB_FILE)).await
    }

    async fn jobs_in_project(&self, project: &str) -> StorageResult<Vec<JobRecord>> {
        let children = self.node_dir(project).join("jobs");
        let mut entries = match tokio::fs::read_dir(&children).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut jobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            match read_json::<JobRecord>(&entry.path().join(JOB_FILE)).await {
                Ok(Some(record)) => jobs.push(record),
                Ok(None) => {}
                Err(e) => {
                    let name = entry.file_name();
                    warn!(project = %project, job = %name.to_string_lossy(), error = %e, "Skipping unreadable job record");
                }
            }
        }
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(jobs)
    }

    async fn builds(&self, job: &JobId) -> StorageResult<Vec<BuildRecord>> {
        let builds_dir = self.node_dir(job.as_str()).join("builds");
        let mut entries = match tokio::fs::read_dir(&builds_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut builds = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(number) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok()) else {
                continue;
            };
            match read_json::<BuildRecord>(&entry.path().join(BUILD_FILE)).await {
                Ok(Some(build)) if build.number == number => builds.push(build),
                Ok(Some(build)) => {
                    warn!(job = %job, dir = number, recorded = build.number, "Build number mismatch, skipping");
                }
                Ok(None) => {}
                Err(e) => warn!(job = %job, build = number, error = %e, "Skipping unreadable build record"),
            }
        }
        builds.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(builds)
    }

    async fn test_report(&self, job: &JobId, number: u64) -> StorageResult<Option<TestReport>> {
        read_json(&self.build_dir(job, number).join(REPORT_FILE)).await
    }
}
