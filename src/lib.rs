//! trimerge library crate: re-exports for the binary and integration tests.
//!
//! The merge engine itself lives in `trimerge-core`. This crate adds the
//! repository configuration, the batch auto-resolve run, the on-disk merge
//! fixtures and telemetry setup.

pub mod config;
pub mod fixture;
pub mod format;
pub mod sequence;
pub mod telemetry;
