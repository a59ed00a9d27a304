//! Trait contract tests for BuildHistory.
//!
//! Every check runs against both the in-memory fake and the filesystem
//! archive. Any conforming implementation must pass these.

use parasplit_history::fakes::MemoryBuildHistory;
use parasplit_history::storage_traits::*;
use parasplit_history::{FsBuildArchive, StorageError};

fn job(name: &str) -> JobId {
    JobId::new(name).unwrap()
}

fn report(classes: &[(&str, f64)]) -> TestReport {
    TestReport {
        suites: vec![TestSuiteResult {
            name: "suite".to_string(),
            cases: classes
                .iter()
                .map(|(class_name, secs)| TestCaseResult {
                    class_name: class_name.to_string(),
                    name: "case".to_string(),
                    duration_secs: *secs,
                })
                .collect(),
        }],
    }
}

/// Seeds the same multi-branch layout into either backend.
trait Seed {
    fn seed_job(&self, record: JobRecord);
    fn seed_build(&self, build: BuildRecord, report: Option<TestReport>);
}

impl Seed for MemoryBuildHistory {
    fn seed_job(&self, record: JobRecord) {
        self.add_job(record);
    }

    fn seed_build(&self, build: BuildRecord, report: Option<TestReport>) {
        let (id, number) = (build.job.clone(), build.number);
        self.add_build(build).unwrap();
        if let Some(report) = report {
            self.attach_report(&id, number, report).unwrap();
        }
    }
}

impl Seed for FsBuildArchive {
    fn seed_job(&self, record: JobRecord) {
        self.register_job(&record).unwrap();
    }

    fn seed_build(&self, build: BuildRecord, report: Option<TestReport>) {
        self.record_build(&build, report.as_ref()).unwrap();
    }
}

fn seed(store: &impl Seed) {
    store.seed_job(JobRecord::new(job("p")));
    store.seed_job(JobRecord::new(job("p/main")).primary());
    store.seed_job(JobRecord::new(job("p/feature")));
    store.seed_job(JobRecord::new(job("other/main")).primary());

    for n in 1..=3 {
        store.seed_build(
            BuildRecord::completed(job("p/main"), n, BuildStatus::Success),
            (n == 2).then(|| report(&[("one", 1.0), ("two", 2.0)])),
        );
    }
    store.seed_build(
        BuildRecord::completed(job("p/feature"), 1, BuildStatus::Running),
        None,
    );
}

async fn check_contract(store: &(impl BuildHistory + ?Sized)) {
    // job lookup
    let main = store.job(&job("p/main")).await.unwrap().expect("p/main");
    assert!(main.primary);
    assert_eq!(main.project(), Some("p"));
    assert!(store.job(&job("p/missing")).await.unwrap().is_none());

    // project membership is one level deep and scoped to the project
    let mut names: Vec<String> = store
        .jobs_in_project("p")
        .await
        .unwrap()
        .into_iter()
        .map(|j| j.id.to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["p/feature", "p/main"]);
    assert!(store.jobs_in_project("nope").await.unwrap().is_empty());

    // builds newest first
    let numbers: Vec<u64> = store
        .builds(&job("p/main"))
        .await
        .unwrap()
        .iter()
        .map(|b| b.number)
        .collect();
    assert_eq!(numbers, vec![3, 2, 1]);
    assert!(store.builds(&job("p/missing")).await.unwrap().is_empty());

    // reports
    assert!(store.test_report(&job("p/main"), 3).await.unwrap().is_none());
    let archived = store
        .test_report(&job("p/main"), 2)
        .await
        .unwrap()
        .expect("report for build 2");
    assert_eq!(archived.class_durations().len(), 2);

    // running builds are listed but not completed
    let feature = store.builds(&job("p/feature")).await.unwrap();
    assert_eq!(feature.len(), 1);
    assert!(!feature[0].is_completed());
}

#[tokio::test]
async fn memory_history_satisfies_contract() {
    let store = MemoryBuildHistory::new();
    seed(&store);
    check_contract(&store).await;
}

#[tokio::test]
async fn fs_archive_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBuildArchive::open(dir.path()).unwrap();
    seed(&store);
    check_contract(&store).await;
}

#[tokio::test]
async fn fs_archive_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FsBuildArchive::open(dir.path()).unwrap();
        seed(&store);
    }
    let reopened = FsBuildArchive::open(dir.path()).unwrap();
    check_contract(&reopened).await;
}

#[tokio::test]
async fn memory_history_corrupt_report_is_error() {
    let store = MemoryBuildHistory::new();
    seed(&store);
    store
        .attach_corrupt_report(&job("p/main"), 3, "truncated")
        .unwrap();

    let err = store.test_report(&job("p/main"), 3).await.unwrap_err();
    assert!(matches!(err, StorageError::MalformedReport { .. }));
}

#[tokio::test]
async fn memory_history_rejects_builds_for_unknown_jobs() {
    let store = MemoryBuildHistory::new();
    let err = store
        .add_build(BuildRecord::completed(job("ghost"), 1, BuildStatus::Success))
        .unwrap_err();
    assert!(matches!(err, StorageError::JobNotFound { .. }));

    store.add_job(JobRecord::new(job("ghost")));
    let err = store
        .attach_report(&job("ghost"), 9, TestReport::default())
        .unwrap_err();
    assert!(matches!(err, StorageError::BuildNotFound { number: 9, .. }));
}
