//! Split engine: resolve a reference build, then partition its durations.

use std::sync::Arc;

use parasplit_history::{BuildHistory, JobId};
use serde::Serialize;
use tracing::Instrument;

use crate::config::SplitConfig;
use crate::model::{BuildReference, ParallelismMode, Split};
use crate::obs::{emit_partitioned, emit_resolved, split_span};
use crate::partition::Partition;
use crate::render::{render, RenderedSplit};
use crate::resolver::ReferenceBuildResolver;

/// Everything computed for one split request.
#[derive(Debug, Clone, Serialize)]
pub struct SplitPlan {
    pub reference: Option<BuildReference>,
    pub fallback_used: bool,
    pub partition: Partition,
}

impl SplitPlan {
    pub fn splits(&self) -> Vec<Split> {
        self.partition.splits()
    }
}

/// Computes splits for jobs recorded in a build history.
#[derive(Clone)]
pub struct SplitEngine {
    history: Arc<dyn BuildHistory>,
    config: SplitConfig,
}

impl SplitEngine {
    pub fn new(history: Arc<dyn BuildHistory>, config: SplitConfig) -> Self {
        Self { history, config }
    }

    /// Resolve the reference build for `job` and partition its durations.
    ///
    /// Never fails: without usable history the plan holds one undivided group.
    pub async fn plan(&self, job: &JobId, mode: ParallelismMode) -> SplitPlan {
        self.plan_inner(job, mode)
            .instrument(split_span(job.as_str()))
            .await
    }

    async fn plan_inner(&self, job: &JobId, mode: ParallelismMode) -> SplitPlan {
        let resolution = ReferenceBuildResolver::new(self.history.as_ref(), &self.config)
            .resolve(job)
            .await;
        emit_resolved(
            resolution.reference.as_ref(),
            resolution.durations.len(),
            resolution.fallback_used,
        );

        let partition = Partition::compute(&resolution.durations, mode);
        emit_partitioned(
            mode.group_count(),
            partition.group_count(),
            resolution.durations.len(),
        );

        SplitPlan {
            reference: resolution.reference,
            fallback_used: resolution.fallback_used,
            partition,
        }
    }

    /// Splits for `job`, exclusion split first.
    pub async fn splits(&self, job: &JobId, mode: ParallelismMode) -> Vec<Split> {
        self.plan(job, mode).await.splits()
    }

    /// Splits for `job` rendered as file patterns.
    pub async fn split(
        &self,
        job: &JobId,
        mode: ParallelismMode,
        generate_inclusions: bool,
    ) -> Vec<RenderedSplit> {
        let plan = self.plan(job, mode).await;
        render(&plan.partition, &self.config, generate_inclusions)
    }
}
