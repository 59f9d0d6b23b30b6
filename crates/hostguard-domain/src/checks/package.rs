use super::{CheckProvider, ListCheck, Verdict, run_list_check};
use crate::host::AuditContext;
use crate::model::{ListSection, RuleDocument, scalar_text};
use crate::options::AuditRequest;
use crate::report::AuditResults;
use crate::resolve::ResolvedCheck;
use crate::version::{LooseVersion, VersionModifier};
use hostguard_types::{AuditOutcome, ListKind, ids};
use serde_json::json;

/// Packages that must (whitelist) or must not (blacklist) be installed.
///
/// Whitelist entries may carry a `version` modifier: `<v` / `<=v` requires the
/// installed version to be at most `v`, `>v` / `>=v` at least `v`, and a bare
/// `v` (or `=v`, `==v`) exactly `v`. A modifier that cannot be parsed fails
/// the entry before the host is queried.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackageCheck;

impl CheckProvider for PackageCheck {
    fn module(&self) -> &'static str {
        ids::MODULE_PACKAGE
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

impl ListCheck for PackageCheck {
    const MODULE: &'static str = ids::MODULE_PACKAGE;
    type State = ();

    fn section(rules: &RuleDocument) -> &ListSection {
        &rules.package
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
        let modifier = match check.kind {
            ListKind::Whitelist => match check.modifier("version").and_then(scalar_text) {
                Some(raw) => match VersionModifier::parse(&raw) {
                    Ok(modifier) => Some(modifier),
                    Err(_) => {
                        return Verdict::fail(
                            ids::CODE_INVALID_MODIFIER,
                            format!(
                                "Invalid modifier in version '{raw}' for package '{name}'. \
                                 Seems like a bug in the profile"
                            ),
                        );
                    }
                },
                None => None,
            },
            ListKind::Blacklist => None,
        };

        let installed = match ctx.probes.package_version(name) {
            Ok(v) => v,
            Err(err) => return Verdict::probe_error(&err),
        };
        if let Some(version) = &installed {
            outcome.insert_data("installed_version", json!(version));
        }

        match (check.kind, installed) {
            (ListKind::Blacklist, Some(_)) => Verdict::fail(
                ids::CODE_BLACKLISTED_INSTALLED,
                format!("Found blacklisted package '{name}' installed on the system"),
            ),
            (ListKind::Blacklist, None) => Verdict::Pass,
            (ListKind::Whitelist, None) => Verdict::fail(
                ids::CODE_REQUIRED_MISSING,
                format!("Could not find requisite package '{name}' installed on the system"),
            ),
            (ListKind::Whitelist, Some(installed)) => match modifier {
                Some(modifier) if !modifier.accepts(&LooseVersion::parse(&installed)) => {
                    Verdict::fail(
                        ids::CODE_VERSION_MISMATCH,
                        format!(
                            "Package '{name}' is installed at version '{installed}', \
                             which does not satisfy '{modifier}'"
                        ),
                    )
                }
                _ => Verdict::Pass,
            },
        }
    }
}
