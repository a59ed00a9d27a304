//! Reference build resolution.
//!
//! Walks a job's completed builds newest first until one yields test
//! durations. A branch job of a multi-branch project with no usable history
//! falls back to the project's primary branch job and repeats the walk there.

use parasplit_history::{BuildHistory, JobId, JobRecord};
use tracing::{debug, info, warn};

use crate::config::SplitConfig;
use crate::durations::load_durations;
use crate::model::{BuildReference, Durations};

/// Outcome of resolving a reference build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// The build whose report was used, `None` if no history was found.
    pub reference: Option<BuildReference>,
    /// Per-class durations from that build; empty when `reference` is `None`.
    pub durations: Durations,
    /// Whether the reference came from the primary branch job.
    pub fallback_used: bool,
}

impl Resolution {
    fn not_found() -> Self {
        Self::default()
    }

    pub fn is_found(&self) -> bool {
        self.reference.is_some()
    }
}

/// Find the primary branch job of the multi-branch project `job` belongs to.
///
/// The primary job is the sibling carrying the `primary` marker set during
/// branch indexing; if several carry it, the lexically smallest name wins.
/// Returns `None` for top-level jobs, when no sibling is marked, or when the
/// marked job is `job` itself.
pub async fn find_primary_branch_job(history: &dyn BuildHistory, job: &JobId) -> Option<JobRecord> {
    let project = job.project()?;
    let siblings = match history.jobs_in_project(project).await {
        Ok(siblings) => siblings,
        Err(e) => {
            warn!(project = %project, error = %e, "Could not list branch jobs");
            return None;
        }
    };

    let primary = siblings
        .into_iter()
        .filter(|j| j.primary)
        .min_by(|a, b| a.id.cmp(&b.id))?;
    (primary.id != *job).then_some(primary)
}

/// Resolves which prior build seeds a split.
pub struct ReferenceBuildResolver<'a> {
    history: &'a dyn BuildHistory,
    config: &'a SplitConfig,
}

impl<'a> ReferenceBuildResolver<'a> {
    pub fn new(history: &'a dyn BuildHistory, config: &'a SplitConfig) -> Self {
        Self { history, config }
    }

    /// Resolve the reference build for `job`. Never fails.
    pub async fn resolve(&self, job: &JobId) -> Resolution {
        if let Some((reference, durations)) = self.scan(job, false).await {
            return found(reference, durations, false);
        }

        if !self.config.primary_fallback {
            debug!(job = %job, "No usable history and primary fallback disabled");
            return Resolution::not_found();
        }

        let Some(primary) = find_primary_branch_job(self.history, job).await else {
            debug!(job = %job, "No usable history and no primary branch job to fall back to");
            return Resolution::not_found();
        };

        match self.scan(&primary.id, true).await {
            Some((reference, durations)) => found(reference, durations, true),
            None => {
                debug!(job = %job, primary = %primary.id, "Primary branch job has no usable history either");
                Resolution::not_found()
            }
        }
    }

    /// Walk completed builds of `job` newest first; stop at the first report
    /// with at least one class.
    async fn scan(&self, job: &JobId, primary: bool) -> Option<(BuildReference, Durations)> {
        let builds = match self.history.builds(job).await {
            Ok(builds) => builds,
            Err(e) => {
                warn!(job = %job, error = %e, "Could not list builds");
                return None;
            }
        };

        let limit = self.config.max_builds_scanned.unwrap_or(usize::MAX);
        let mut completed = builds.into_iter().filter(|b| b.is_completed()).take(limit).peekable();

        if primary {
            let first = completed.peek()?;
            info!("Scanning primary project for test records. Starting with build {first}");
        }

        for build in completed {
            let reference = BuildReference::new(build.job, build.number);
            let durations = load_durations(self.history, &reference).await;
            if !durations.is_empty() {
                return Some((reference, durations));
            }
            debug!(build = %reference, "No test durations, trying an older build");
        }
        None
    }
}

fn found(reference: BuildReference, durations: Durations, fallback_used: bool) -> Resolution {
    info!("Using build #{} as reference", reference.number);
    Resolution {
        reference: Some(reference),
        durations,
        fallback_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parasplit_history::fakes::MemoryBuildHistory;
    use parasplit_history::{BuildRecord, BuildStatus, TestCaseResult, TestReport, TestSuiteResult};

    fn job(name: &str) -> JobId {
        JobId::new(name).unwrap()
    }

    fn report(class_name: &str) -> TestReport {
        TestReport {
            suites: vec![TestSuiteResult {
                name: "s".to_string(),
                cases: vec![TestCaseResult {
                    class_name: class_name.to_string(),
                    name: "t".to_string(),
                    duration_secs: 1.0,
                }],
            }],
        }
    }

    fn add_builds(history: &MemoryBuildHistory, id: &JobId, numbers: impl IntoIterator<Item = u64>) {
        for n in numbers {
            history
                .add_build(BuildRecord::completed(id.clone(), n, BuildStatus::Success))
                .unwrap();
        }
    }

    #[tokio::test]
    async fn primary_lookup_ignores_top_level_jobs() {
        let history = MemoryBuildHistory::new();
        history.add_job(JobRecord::new(job("solo")).primary());
        assert!(find_primary_branch_job(&history, &job("solo")).await.is_none());
    }

    #[tokio::test]
    async fn primary_lookup_never_returns_the_job_itself() {
        let history = MemoryBuildHistory::new();
        history.add_job(JobRecord::new(job("p/main")).primary());
        assert!(find_primary_branch_job(&history, &job("p/main")).await.is_none());
    }

    #[tokio::test]
    async fn primary_lookup_prefers_smallest_marked_name() {
        let history = MemoryBuildHistory::new();
        history.add_job(JobRecord::new(job("p/zeta")).primary());
        history.add_job(JobRecord::new(job("p/alpha")).primary());
        history.add_job(JobRecord::new(job("p/feature")));

        let primary = find_primary_branch_job(&history, &job("p/feature")).await.unwrap();
        assert_eq!(primary.id, job("p/alpha"));
    }

    #[tokio::test]
    async fn running_builds_are_skipped() {
        let history = MemoryBuildHistory::new();
        let id = job("solo");
        history.add_job(JobRecord::new(id.clone()));
        add_builds(&history, &id, [1]);
        history
            .add_build(BuildRecord::completed(id.clone(), 2, BuildStatus::Running))
            .unwrap();
        history.attach_report(&id, 1, report("one")).unwrap();
        history.attach_report(&id, 2, report("two")).unwrap();

        let config = SplitConfig::default();
        let resolution = ReferenceBuildResolver::new(&history, &config).resolve(&id).await;
        assert_eq!(resolution.reference, Some(BuildReference::new(id, 1)));
    }

    #[tokio::test]
    async fn failed_builds_still_count() {
        let history = MemoryBuildHistory::new();
        let id = job("solo");
        history.add_job(JobRecord::new(id.clone()));
        history
            .add_build(BuildRecord::completed(id.clone(), 1, BuildStatus::Unstable))
            .unwrap();
        history.attach_report(&id, 1, report("one")).unwrap();

        let config = SplitConfig::default();
        let resolution = ReferenceBuildResolver::new(&history, &config).resolve(&id).await;
        assert!(resolution.is_found());
        assert!(!resolution.fallback_used);
    }

    #[tokio::test]
    async fn scan_limit_stops_the_walk() {
        let history = MemoryBuildHistory::new();
        let id = job("solo");
        history.add_job(JobRecord::new(id.clone()));
        add_builds(&history, &id, 1..=5);
        history.attach_report(&id, 1, report("old")).unwrap();

        let config = SplitConfig::default().with_max_builds_scanned(3);
        let resolution = ReferenceBuildResolver::new(&history, &config).resolve(&id).await;
        assert!(!resolution.is_found());
        assert!(resolution.durations.is_empty());
    }

    #[tokio::test]
    async fn disabled_fallback_stays_on_own_job() {
        let history = MemoryBuildHistory::new();
        let primary = job("p/main");
        history.add_job(JobRecord::new(primary.clone()).primary());
        history.add_job(JobRecord::new(job("p/feature")));
        add_builds(&history, &primary, [1]);
        history.attach_report(&primary, 1, report("one")).unwrap();

        let config = SplitConfig::default().without_primary_fallback();
        let resolution = ReferenceBuildResolver::new(&history, &config)
            .resolve(&job("p/feature"))
            .await;
        assert!(!resolution.is_found());
    }

    #[tokio::test]
    async fn empty_report_is_not_usable() {
        let history = MemoryBuildHistory::new();
        let id = job("solo");
        history.add_job(JobRecord::new(id.clone()));
        add_builds(&history, &id, 1..=2);
        history.attach_report(&id, 2, TestReport::default()).unwrap();
        history.attach_report(&id, 1, report("one")).unwrap();

        let config = SplitConfig::default();
        let resolution = ReferenceBuildResolver::new(&history, &config).resolve(&id).await;
        assert_eq!(resolution.reference.map(|r| r.number), Some(1));
    }
}
