use std::collections::BTreeSet;

/// Which checks a run evaluates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRequest {
    /// Shell glob matched against each check's tag.
    pub tags: String,
    /// Checks must carry every one of these labels.
    pub labels: BTreeSet<String>,
    /// Log merged rules and tag indexes at debug level.
    pub debug: bool,
}

impl Default for AuditRequest {
    fn default() -> Self {
        Self {
            tags: "*".to_string(),
            labels: BTreeSet::new(),
            debug: false,
        }
    }
}

/// How the final report is shaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportOptions {
    /// `false` collapses every outcome to `{tag: description}`.
    pub verbose: bool,
    /// `false` drops the Success and Skipped buckets.
    pub show_success: bool,
    pub show_compliance: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            verbose: true,
            show_success: true,
            show_compliance: false,
        }
    }
}
