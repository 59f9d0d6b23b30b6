//! Use case orchestration for hostguard.
//!
//! This crate coordinates the domain, repo, and settings layers: it turns rule
//! references (or a topfile) plus a host context into a report envelope. It is
//! intentionally thin and delegates the heavy lifting to those layers.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod audit;
mod report;

pub use audit::{AuditOutput, load_config, run_audit, run_top, with_snapshot_context};
pub use report::{
    envelope_schema, report_exit_code, serialize_envelope, write_report, write_text,
};
