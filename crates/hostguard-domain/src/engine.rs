use crate::checks;
use crate::host::AuditContext;
use crate::merge::merge_documents;
use crate::model::RuleDocument;
use crate::options::{AuditRequest, ReportOptions};
use crate::report::AuditResults;
use hostguard_types::{AuditOutcome, AuditReport, ReportEntry};
use tracing::debug;

/// Evaluate `(profile, document)` pairs against the host in `ctx`.
///
/// Documents are merged in order, generic checks run first, then every
/// provider, then compensating controls are applied to the failures.
pub fn evaluate(
    documents: &[(String, RuleDocument)],
    request: &AuditRequest,
    ctx: &AuditContext<'_>,
) -> AuditResults {
    let merged = merge_documents(documents.iter().map(|(p, d)| (p.as_str(), d)));
    if request.debug {
        debug!(profiles = ?merged.profiles(), merged = ?merged, "merged rule documents");
    }

    let mut results = AuditResults::default();
    checks::generic::run(&merged.generic, request, ctx, &mut results);
    checks::run_all(&merged, request, ctx, &mut results);
    checks::controls::apply(&merged.controls, &mut results);

    debug!(
        success = results.success.len(),
        failure = results.failure.len(),
        skipped = results.skipped.len(),
        controlled = results.controlled.len(),
        "evaluation finished"
    );
    results
}

/// Shape raw results into the report.
///
/// - `verbose = false` collapses each outcome to `{tag: description}`, or
///   `{tag: control reason}` for controlled outcomes;
/// - `show_success = false` drops Success and Skipped, otherwise Skipped is
///   dropped only when empty;
/// - Controlled is dropped when empty, Failure is always present.
pub fn finalize(results: AuditResults, options: &ReportOptions) -> AuditReport {
    let compliance = if options.show_compliance {
        results.compliance_percent().map(|p| format!("{p}%"))
    } else {
        None
    };

    let shape = |outcomes: Vec<AuditOutcome>| -> Vec<ReportEntry> {
        outcomes
            .into_iter()
            .map(|o| {
                if options.verbose {
                    ReportEntry::Verbose(o)
                } else {
                    ReportEntry::terse(&o)
                }
            })
            .collect()
    };

    let AuditResults {
        success,
        failure,
        skipped,
        controlled,
    } = results;

    let (success, skipped) = if options.show_success {
        let skipped = (!skipped.is_empty()).then(|| shape(skipped));
        (Some(shape(success)), skipped)
    } else {
        (None, None)
    };
    let controlled = (!controlled.is_empty()).then(|| shape(controlled));

    AuditReport {
        success,
        failure: shape(failure),
        skipped,
        controlled,
        compliance,
    }
}
