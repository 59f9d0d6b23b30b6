//! Check providers.
//!
//! List-based check types (package, policy-setting, kernel-param) share one
//! resolution core, [`run_list_check`], and only supply the per-instance
//! comparison through [`ListCheck`]. Listening ports and the vulnerability
//! lookup iterate observed host state instead and implement
//! [`CheckProvider`] directly.

use crate::error::ProbeError;
use crate::glob::glob_matches;
use crate::host::AuditContext;
use crate::labels::filter_section;
use crate::model::{ListSection, RuleDocument};
use crate::options::AuditRequest;
use crate::report::AuditResults;
use crate::resolve::{ResolvedCheck, resolve_section};
use hostguard_types::{AuditOutcome, Bucket, ids};
use tracing::debug;

pub mod controls;
pub mod generic;
mod kernel_param;
mod listening_port;
mod package;
mod policy_setting;
mod utils;
mod vulnerability;


pub use kernel_param::KernelParamCheck;
pub use listening_port::ListeningPortCheck;
pub use package::PackageCheck;
pub use policy_setting::{POLICY_TEMPLATE_PROBE, PolicySettingCheck};
pub use vulnerability::VulnerabilityCheck;

/// One check type evaluated against merged rules.
pub trait CheckProvider {
    /// Rule section (check type) this provider consumes.
    fn module(&self) -> &'static str;

    /// Append outcomes for every applicable check. Host probe failures become
    /// Failure outcomes; nothing is propagated.
    fn evaluate(
        &self,
        rules: &RuleDocument,
        request: &AuditRequest,
        ctx: &AuditContext<'_>,
        out: &mut AuditResults,
    );
}

/// Every built-in provider, in evaluation order.
pub fn providers() -> [&'static dyn CheckProvider; 5] {
    [
        &PackageCheck,
        &ListeningPortCheck,
        &PolicySettingCheck,
        &KernelParamCheck,
        &VulnerabilityCheck,
    ]
}

pub fn run_all(
    rules: &RuleDocument,
    request: &AuditRequest,
    ctx: &AuditContext<'_>,
    out: &mut AuditResults,
) {
    for provider in providers() {
        provider.evaluate(rules, request, ctx, out);
    }
}

/// Result of checking one resolved instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Pass,
    Fail { code: &'static str, reason: String },
    /// Not applicable to this host; not reported at all.
    Excluded,
}

impl Verdict {
    pub(crate) fn fail(code: &'static str, reason: impl Into<String>) -> Self {
        Verdict::Fail {
            code,
            reason: reason.into(),
        }
    }

    pub(crate) fn probe_error(err: &ProbeError) -> Self {
        Verdict::fail(ids::CODE_PROBE_ERROR, err.to_string())
    }
}

/// Per-check-type behavior plugged into the shared list resolver.
pub(crate) trait ListCheck {
    const MODULE: &'static str;

    /// Host state read at most once per run.
    type State;

    fn section(rules: &RuleDocument) -> &ListSection;

    /// Called lazily, only when some instance actually needs executing.
    fn prepare(&self, ctx: &AuditContext<'_>) -> Self::State;

    fn check(
        &self,
        state: &Self::State,
        check: &ResolvedCheck,
        ctx: &AuditContext<'_>,
        outcome: &mut AuditOutcome,
    ) -> Verdict;
}

/// Label filter, variant resolution, tag glob, control short-circuit, then
/// the provider's own comparison.
pub(crate) fn run_list_check<C: ListCheck>(
    provider: &C,
    rules: &RuleDocument,
    request: &AuditRequest,
    ctx: &AuditContext<'_>,
    out: &mut AuditResults,
) {
    let section = C::section(rules);
    if section.is_empty() {
        return;
    }
    let filtered = filter_section(section, &request.labels);
    let index = resolve_section(C::MODULE, &filtered, ctx.os_identifier());
    if request.debug {
        debug!(module = C::MODULE, section = ?filtered, "labelled rules");
        debug!(module = C::MODULE, index = ?index, "resolved tag index");
    }

    let mut state: Option<C::State> = None;
    for (tag, checks) in &index {
        if !glob_matches(&request.tags, tag) {
            continue;
        }
        for check in checks {
            let mut outcome = utils::outcome_for(check);
            if let Some(reason) = &check.control {
                outcome.control = Some(reason.clone());
                utils::push(out, Bucket::Controlled, outcome);
                continue;
            }
            let state = state.get_or_insert_with(|| provider.prepare(ctx));
            match provider.check(state, check, ctx, &mut outcome) {
                Verdict::Pass => utils::push(out, Bucket::Success, outcome),
                Verdict::Fail { code, reason } => {
                    utils::mark_failed(&mut outcome, code, reason);
                    utils::push(out, Bucket::Failure, outcome);
                }
                Verdict::Excluded => {
                    debug!(module = C::MODULE, tag = %check.tag, name = %check.name, "check not applicable to host");
                }
            }
        }
    }
}
