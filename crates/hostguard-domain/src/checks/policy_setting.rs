use super::{CheckProvider, ListCheck, Verdict, run_list_check};
use crate::error::ProbeError;
use crate::host::AuditContext;
use crate::model::{ListSection, RuleDocument};
use crate::options::AuditRequest;
use crate::report::AuditResults;
use crate::resolve::ResolvedCheck;
use hostguard_types::{AuditOutcome, ListKind, ids};
use std::collections::BTreeSet;
use tracing::debug;

/// Platform query listing the installed policy templates, used when the host
/// cannot report its policy settings directly.
pub const POLICY_TEMPLATE_PROBE: &str =
    "Get-ChildItem //$env:USERDNSDOMAIN/SYSVOL/$env:USERDNSDOMAIN/Policies/PolicyDefinitions | Format-List -Property Name, SID";

/// Policy settings that must (whitelist) or must not (blacklist) be present.
///
/// Instances may opt out of domain controllers (`run_on_dc: false`) or member
/// servers (`run_on_member_server: false`); opted-out instances are not reported.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolicySettingCheck;

#[derive(Debug)]
pub(crate) struct PolicyHost {
    settings: BTreeSet<String>,
    domain_controller: bool,
}

impl CheckProvider for PolicySettingCheck {
    fn module(&self) -> &'static str {
        ids::MODULE_POLICY_SETTING
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

impl ListCheck for PolicySettingCheck {
    const MODULE: &'static str = ids::MODULE_POLICY_SETTING;
    type State = Result<PolicyHost, ProbeError>;

    fn section(rules: &RuleDocument) -> &ListSection {
        &rules.policy_setting
    }

    fn prepare(&self, ctx: &AuditContext<'_>) -> Self::State {
        let settings = match ctx.probes.current_policy_settings() {
            Ok(settings) => settings,
            Err(err) if err.is_unsupported() => {
                debug!("policy settings not reported by host; listing templates");
                parse_template_names(&ctx.probes.run_probe(POLICY_TEMPLATE_PROBE)?)
            }
            Err(err) => return Err(err),
        };
        let domain_controller = match ctx.probes.is_domain_controller() {
            Ok(dc) => dc,
            Err(err) if err.is_unsupported() => false,
            Err(err) => return Err(err),
        };
        Ok(PolicyHost {
            settings,
            domain_controller,
        })
    }

    fn check(
        &self,
        state: &Self::State,
        check: &ResolvedCheck,
        _ctx: &AuditContext<'_>,
        _outcome: &mut AuditOutcome,
    ) -> Verdict {
        let host = match state {
            Ok(host) => host,
            Err(err) => return Verdict::probe_error(err),
        };
        if host.domain_controller && !check.flag("run_on_dc", true) {
            return Verdict::Excluded;
        }
        if !host.domain_controller && !check.flag("run_on_member_server", true) {
            return Verdict::Excluded;
        }

        let name = &check.name;
        let present = host.settings.contains(name);
        match (check.kind, present) {
            (ListKind::Blacklist, false) | (ListKind::Whitelist, true) => Verdict::Pass,
            (ListKind::Blacklist, true) => Verdict::fail(
                ids::CODE_SETTING_PRESENT,
                format!("Blacklisted policy setting '{name}' is present"),
            ),
            (ListKind::Whitelist, false) => Verdict::fail(
                ids::CODE_SETTING_MISSING,
                format!("Required policy setting '{name}' is not present"),
            ),
        }
    }
}

/// Extract the `Name : value` lines of a `Format-List` listing.
pub(crate) fn parse_template_names(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case("name"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
