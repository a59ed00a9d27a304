//! Parasplit-History: build history persistence for Parasplit
//!
//! This crate provides the storage layer the split engine reads from: jobs,
//! their numbered builds, and the test reports archived with those builds.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: read-only access for the engine, simple atomic writes for recorders.
//!
//! ## Key Components
//!
//! - `BuildHistory`: async read trait implemented by every backend
//! - `FsBuildArchive`: JSON files on disk, one directory per build
//! - `fakes::MemoryBuildHistory`: in-memory backend for tests

mod error;
pub mod fakes;
mod fs_archive;
pub mod storage_traits;

pub use error::StorageError;
pub use fs_archive::FsBuildArchive;
pub use storage_traits::{
    BuildHistory, BuildRecord, BuildStatus, JobId, JobRecord, StorageResult, TestCaseResult,
    TestReport, TestSuiteResult,
};
