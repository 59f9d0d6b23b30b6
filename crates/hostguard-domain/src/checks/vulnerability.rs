use super::{CheckProvider, utils};
use crate::host::{AuditContext, InstalledPackage};
use crate::model::RuleDocument;
use crate::options::AuditRequest;
use crate::report::AuditResults;
use hostguard_types::{AuditOutcome, Bucket, ids};
use serde_json::json;
use tracing::debug;

const SECURE_TAG: &str = "Secure packages";

/// Installed packages checked against a vulnerability feed.
///
/// Enabled by a `vulnerability` section in any rule document. Produces one
/// Success summarizing the secure packages and one Failure per vulnerable
/// package.
#[derive(Clone, Copy, Debug, Default)]
pub struct VulnerabilityCheck;

impl CheckProvider for VulnerabilityCheck {
    fn module(&self) -> &'static str {
        ids::MODULE_VULNERABILITY
    }

    fn evaluate(
        &self,
        rules: &RuleDocument,
        request: &AuditRequest,
        ctx: &AuditContext<'_>,
        out: &mut AuditResults,
    ) {
        let Some(section) = &rules.vulnerability else {
            return;
        };
        let profile = section.profile.clone();
        let mut fail = |code: &str, reason: String| {
            let mut outcome = AuditOutcome::new(ids::MODULE_VULNERABILITY, ids::MODULE_VULNERABILITY);
            outcome.profile = profile.clone();
            utils::mark_failed(&mut outcome, code, reason);
            utils::push(out, Bucket::Failure, outcome);
        };

        let Some(feed) = ctx.vulnerabilities else {
            fail(
                ids::CODE_PROBE_ERROR,
                "no vulnerability feed is configured for this host".to_string(),
            );
            return;
        };
        let family = ctx.facts.os_family.as_deref().unwrap_or_default().to_ascii_lowercase();
        let os = ctx.facts.os_name.as_deref().unwrap_or_default().to_ascii_lowercase();
        let release = ctx.facts.os_release.clone().unwrap_or_default();
        let arch = ctx.facts.architecture.clone().unwrap_or_default();
        if request.debug {
            debug!(os = %os, release = %release, family = %family, "vulnerability lookup");
        }

        let installed = match ctx.probes.installed_packages() {
            Ok(p) => p,
            Err(err) => return fail(ids::CODE_PROBE_ERROR, err.to_string()),
        };
        let Some(formatted) = format_packages(&family, &arch, &installed) else {
            return fail(
                ids::CODE_UNSUPPORTED_OS_FAMILY,
                format!("Vulnerability lookup does not support OS family '{family}'"),
            );
        };
        let vulnerable = match feed.audit(&os, &release, &formatted) {
            Ok(v) => v,
            Err(err) => return fail(ids::CODE_PROBE_ERROR, err.to_string()),
        };

        let total = formatted.len();
        let secure = total.saturating_sub(vulnerable.len());
        let mut summary = AuditOutcome::new(SECURE_TAG, ids::MODULE_VULNERABILITY);
        summary.description = Some(format!("{secure} out of {total}"));
        summary.profile = profile.clone();
        utils::push(out, Bucket::Success, summary);

        for (package, vuln_ids) in vulnerable {
            let mut outcome =
                AuditOutcome::new(format!("Vulnerable package: {package}"), ids::MODULE_VULNERABILITY);
            outcome.name = Some(package);
            outcome.description = Some(vuln_ids.join(", "));
            outcome.profile = profile.clone();
            outcome.insert_data("vulnerabilities", json!(vuln_ids));
            utils::mark_failed(
                &mut outcome,
                ids::CODE_VULNERABLE_PACKAGE,
                format!("{} known vulnerabilities", vuln_ids.len()),
            );
            utils::push(out, Bucket::Failure, outcome);
        }
    }
}

/// Package strings in the form the feed expects for the OS family, or `None`
/// for unsupported families.
pub(crate) fn format_packages(
    family: &str,
    host_arch: &str,
    packages: &[InstalledPackage],
) -> Option<Vec<String>> {
    let arch = |p: &InstalledPackage| p.architecture.clone().unwrap_or_else(|| host_arch.to_string());
    match family {
        "debian" => Some(
            packages
                .iter()
                .map(|p| format!("{} {} {}", p.name, p.version, arch(p)))
                .collect(),
        ),
        "redhat" => Some(
            packages
                .iter()
                .map(|p| format!("{}-{}.{}", p.name, p.version, arch(p)))
                .collect(),
        ),
        _ => None,
    }
}
