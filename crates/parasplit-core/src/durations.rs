//! Duration Store accessor: per-class duration estimates of one build.

use parasplit_history::BuildHistory;
use tracing::debug;

use crate::model::{BuildReference, Durations};
use crate::obs::emit_report_unreadable;

/// Load per-class durations from the report archived with `build`.
///
/// Never fails: a build without a report, or with an unreadable one, yields
/// an empty mapping.
pub async fn load_durations(history: &dyn BuildHistory, build: &BuildReference) -> Durations {
    match history.test_report(&build.job, build.number).await {
        Ok(Some(report)) => report.class_durations(),
        Ok(None) => {
            debug!(build = %build, "No test report archived");
            Durations::new()
        }
        Err(e) => {
            emit_report_unreadable(build, &e);
            Durations::new()
        }
    }
}
