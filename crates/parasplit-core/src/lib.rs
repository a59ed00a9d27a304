//! Parasplit Core - history-driven test splitting
//!
//! Splits a test suite into balanced groups for parallel CI executors:
//! - Resolves a reference build with usable test durations, falling back to
//!   the primary branch job of a multi-branch project
//! - Packs classes into groups longest-first
//! - Renders groups as include/exclude file patterns
//!
//! One group is always an exclusion group, so classes with no recorded
//! duration still run.

pub mod config;
pub mod durations;
pub mod engine;
pub mod model;
pub mod obs;
pub mod partition;
pub mod render;
pub mod resolver;
pub mod telemetry;

pub use config::{ConfigError, SplitConfig};
pub use durations::load_durations;
pub use engine::{SplitEngine, SplitPlan};
pub use model::{BuildReference, Durations, ParallelismMode, ParseParallelismError, Split, TestClass};
pub use obs::{emit_partitioned, emit_report_unreadable, emit_resolved, split_span};
pub use partition::{partition, Bucket, Partition};
pub use render::{class_patterns, render, RenderedSplit};
pub use resolver::{find_primary_branch_job, ReferenceBuildResolver, Resolution};
pub use telemetry::init_tracing;

pub use parasplit_history::{BuildHistory, JobId};
