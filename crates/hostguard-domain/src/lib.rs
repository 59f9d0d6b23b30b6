//! Pure rule resolution and audit evaluation (no IO).
//!
//! Input: parsed rule documents plus an [`host::AuditContext`] describing the host.
//! Output: bucketed outcomes and the post-processed report.

#![forbid(unsafe_code)]

pub mod checks;
pub mod error;
pub mod fingerprint;
pub mod host;
pub mod labels;
pub mod merge;
pub mod model;
pub mod options;
pub mod report;
pub mod resolve;
pub mod target;
pub mod version;

mod engine;
mod glob;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use engine::{evaluate, finalize};
