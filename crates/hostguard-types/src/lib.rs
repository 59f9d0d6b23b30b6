//! Stable DTOs and IDs used across the hostguard workspace.
//!
//! This crate is intentionally boring:
//! - data types for audit outcomes and the emitted report
//! - stable string IDs for check-types and failure codes
//! - canonical rule-file references

#![forbid(unsafe_code)]

pub mod ids;
pub mod outcome;
pub mod rule_ref;

pub use outcome::{
    AuditOutcome, AuditReport, Bucket, ListKind, NO_DESCRIPTION, ReportEntry, ReportEnvelope,
    RunHost, SCHEMA_AUDIT_REPORT_V1, ToolMeta,
};
pub use rule_ref::RuleRef;
