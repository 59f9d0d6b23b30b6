use super::{CheckProvider, ListCheck, Verdict, run_list_check};
use crate::host::AuditContext;
use crate::model::{ListSection, RuleDocument, scalar_text};
use crate::options::AuditRequest;
use crate::report::AuditResults;
use crate::resolve::ResolvedCheck;
use hostguard_types::{AuditOutcome, ListKind, ids};
use serde_json::json;

/// Kernel parameters compared against their expected `match_output`.
///
/// Whitelist entries pass when the value equals `match_output`; blacklist
/// entries pass when it does not.
#[derive(Clone, Copy, Debug, Default)]
pub struct KernelParamCheck;

impl CheckProvider for KernelParamCheck {
    fn module(&self) -> &'static str {
        ids::MODULE_KERNEL_PARAM
    }

    fn evaluate(
        &self,
        rules: &RuleDocument,
        request: &AuditRequest,
        ctx: &AuditContext<'_>,
        out: &mut AuditResults,
    ) {
        run_list_check(self, rules, request, ctx, out);
    }
}

impl ListCheck for KernelParamCheck {
    const MODULE: &'static str = ids::MODULE_KERNEL_PARAM;
    type State = ();

    fn section(rules: &RuleDocument) -> &ListSection {
        &rules.kernel_param
    }

    fn prepare(&self, _ctx: &AuditContext<'_>) {}

    fn check(
        &self,
        _state: &(),
        check: &ResolvedCheck,
        ctx: &AuditContext<'_>,
        outcome: &mut AuditOutcome,
    ) -> Verdict {
        let name = &check.name;
        let Some(expected) = check.modifier("match_output").and_then(scalar_text) else {
            return Verdict::fail(
                ids::CODE_MISSING_MATCH_OUTPUT,
                format!("Kernel attribute '{name}' has no match_output. Seems like a bug in the profile"),
            );
        };
        let current = match ctx.probes.kernel_param(name) {
            Ok(Some(v)) => v,
            Ok(None) => {
                return Verdict::fail(
                    ids::CODE_PARAM_MISSING,
                    format!("Could not find attribute '{name}' in the kernel"),
                );
            }
            Err(err) => return Verdict::probe_error(&err),
        };
        outcome.insert_data("current_value", json!(current));

        let equal = current.trim() == expected.trim();
        match (check.kind, equal) {
            (ListKind::Whitelist, true) | (ListKind::Blacklist, false) => Verdict::Pass,
            (ListKind::Whitelist, false) => Verdict::fail(
                ids::CODE_PARAM_MISMATCH,
                format!(
                    "Current value of kernel attribute '{name}' is '{current}'. It should be set to '{expected}'"
                ),
            ),
            (ListKind::Blacklist, true) => Verdict::fail(
                ids::CODE_PARAM_MISMATCH,
                format!("Kernel attribute '{name}' is set to the forbidden value '{current}'"),
            ),
        }
    }
}
