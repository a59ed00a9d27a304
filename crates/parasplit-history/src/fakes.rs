//! In-memory fake for the `BuildHistory` trait (testing only)
//!
//! `MemoryBuildHistory` satisfies the trait contract without touching the
//! filesystem, and can simulate unreadable reports.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug, Clone)]
enum ReportSlot {
    Present(TestReport),
    Corrupt(String),
}

#[derive(Debug)]
struct JobState {
    record: JobRecord,
    builds: BTreeMap<u64, BuildRecord>,
    reports: HashMap<u64, ReportSlot>,
}

/// In-memory build history backed by a `BTreeMap<JobId, JobState>`.
#[derive(Debug, Default)]
pub struct MemoryBuildHistory {
    jobs: Mutex<BTreeMap<JobId, JobState>>,
}

impl MemoryBuildHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Re-registering replaces its record but keeps builds.
    pub fn add_job(&self, record: JobRecord) {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&record.id) {
            Some(state) => state.record = record,
            None => {
                jobs.insert(
                    record.id.clone(),
                    JobState {
                        record,
                        builds: BTreeMap::new(),
                        reports: HashMap::new(),
                    },
                );
            }
        }
    }

    /// Add a build to a registered job.
    pub fn add_build(&self, build: BuildRecord) -> StorageResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let state = jobs
            .get_mut(&build.job)
            .ok_or_else(|| StorageError::JobNotFound {
                job: build.job.to_string(),
            })?;
        state.builds.insert(build.number, build);
        Ok(())
    }

    /// Archive a test report with an existing build.
    pub fn attach_report(&self, job: &JobId, number: u64, report: TestReport) -> StorageResult<()> {
        self.put_slot(job, number, ReportSlot::Present(report))
    }

    /// Mark a build's archived report as unreadable.
    pub fn attach_corrupt_report(&self, job: &JobId, number: u64, reason: &str) -> StorageResult<()> {
        self.put_slot(job, number, ReportSlot::Corrupt(reason.to_string()))
    }

    fn put_slot(&self, job: &JobId, number: u64, slot: ReportSlot) -> StorageResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let state = jobs.get_mut(job).ok_or_else(|| StorageError::JobNotFound {
            job: job.to_string(),
        })?;
        if !state.builds.contains_key(&number) {
            return Err(StorageError::BuildNotFound {
                job: job.to_string(),
                number,
            });
        }
        state.reports.insert(number, slot);
        Ok(())
    }
}

#[async_trait]
impl BuildHistory for MemoryBuildHistory {
    async fn job(&self, job: &JobId) -> StorageResult<Option<JobRecord>> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.get(job).map(|s| s.record.clone()))
    }

    async fn jobs_in_project(&self, project: &str) -> StorageResult<Vec<JobRecord>> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .filter(|s| s.record.project() == Some(project))
            .map(|s| s.record.clone())
            .collect())
    }

    async fn builds(&self, job: &JobId) -> StorageResult<Vec<BuildRecord>> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .get(job)
            .map(|s| s.builds.values().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn test_report(&self, job: &JobId, number: u64) -> StorageResult<Option<TestReport>> {
        let jobs = self.jobs.lock().unwrap();
        let Some(state) = jobs.get(job) else {
            return Err(StorageError::JobNotFound {
                job: job.to_string(),
            });
        };
        match state.reports.get(&number) {
            Some(ReportSlot::Present(report)) => Ok(Some(report.clone())),
            Some(ReportSlot::Corrupt(reason)) => Err(StorageError::MalformedReport {
                location: format!("{job} #{number}"),
                reason: reason.clone(),
            }),
            None => Ok(None),
        }
    }
}
