//! The `audit` and `top` use cases.

use anyhow::Context;
use camino::Utf8Path;
use hostguard_domain::checks::controls;
use hostguard_domain::host::{AuditContext, TargetMatcher};
use hostguard_domain::model::{ControlEntry, RuleDocument};
use hostguard_domain::options::{AuditRequest, ReportOptions};
use hostguard_domain::report::AuditResults;
use hostguard_domain::target::FactTargetMatcher;
use hostguard_repo::{HostSnapshot, RuleStore, expand_references, load_documents, load_topfile};
use hostguard_settings::{HostguardConfigV1, Overrides, ResolvedConfig};
use hostguard_types::{
    AuditReport, ReportEnvelope, RuleRef, RunHost, SCHEMA_AUDIT_REPORT_V1, ToolMeta,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Result of an audit run.
#[derive(Clone, Debug)]
pub struct AuditOutput {
    pub envelope: ReportEnvelope,
}

/// Read and resolve `hostguard.toml`. A missing file means defaults.
pub fn load_config(path: Option<&Utf8Path>, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    let cfg = match path {
        Some(path) if path.is_file() => {
            let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
            hostguard_settings::parse_config_toml(&text)
                .with_context(|| format!("parse config {path}"))?
        }
        Some(path) => {
            debug!(path = %path, "config file not found; using defaults");
            HostguardConfigV1::default()
        }
        None => HostguardConfigV1::default(),
    };
    hostguard_settings::resolve_config(cfg, overrides).context("resolve config")
}

/// Build an [`AuditContext`] served entirely by a recorded snapshot.
pub fn with_snapshot_context<R>(
    snapshot: &HostSnapshot,
    f: impl FnOnce(&AuditContext<'_>) -> R,
) -> R {
    let targets = FactTargetMatcher::new(&snapshot.facts);
    let ctx = AuditContext {
        facts: &snapshot.facts,
        probes: snapshot,
        targets: &targets as &dyn TargetMatcher,
        functions: snapshot,
        vulnerabilities: snapshot.vulnerability_feed(),
    };
    f(&ctx)
}

/// Audit the host against explicit rule references.
///
/// References that cannot be fetched or parsed are logged and skipped; an
/// empty reference list produces an empty report.
pub fn run_audit(
    store: &dyn RuleStore,
    refs: &[RuleRef],
    request: &AuditRequest,
    options: &ReportOptions,
    ctx: &AuditContext<'_>,
) -> AuditOutput {
    let started_at = OffsetDateTime::now_utc();
    if refs.is_empty() {
        warn!("no rule references given; nothing to audit");
    }

    let (documents, results) = audit_refs(store, refs, request, ctx);
    let rules = documents.iter().map(|(p, _)| p.clone()).collect();
    let report = hostguard_domain::finalize(results, options);
    AuditOutput {
        envelope: envelope(started_at, ctx, rules, report),
    }
}

/// Audit the host against every reference its topfile selects.
///
/// References are grouped by effective tag glob and each group is audited with
/// that glob; results are combined before post-processing. A missing or
/// malformed topfile is an error.
pub fn run_top(
    store: &dyn RuleStore,
    topfile: &RuleRef,
    request: &AuditRequest,
    options: &ReportOptions,
    ctx: &AuditContext<'_>,
) -> anyhow::Result<AuditOutput> {
    let started_at = OffsetDateTime::now_utc();
    let top = load_topfile(store, topfile).with_context(|| format!("load topfile {topfile}"))?;

    let groups = top.select(ctx.targets, &request.tags);
    if groups.is_empty() {
        warn!(topfile = %topfile, "no topfile target matches this host; nothing to audit");
    }

    let mut combined = AuditResults::default();
    let mut rules = Vec::new();
    let mut all_controls: Vec<ControlEntry> = Vec::new();
    for (tags, refs) in groups {
        info!(tags = %tags, rules = refs.len(), "auditing topfile group");
        let group_request = AuditRequest {
            tags,
            ..request.clone()
        };
        let (documents, results) = audit_refs(store, &refs, &group_request, ctx);
        for (profile, doc) in &documents {
            rules.push(profile.clone());
            all_controls.extend(doc.controls.iter().cloned());
        }
        combined.extend(results);
    }
    // Controls declared in one group also cover failures from the others.
    controls::apply(&all_controls, &mut combined);

    let report = hostguard_domain::finalize(combined, options);
    Ok(AuditOutput {
        envelope: envelope(started_at, ctx, rules, report),
    })
}

fn audit_refs(
    store: &dyn RuleStore,
    refs: &[RuleRef],
    request: &AuditRequest,
    ctx: &AuditContext<'_>,
) -> (Vec<(String, RuleDocument)>, AuditResults) {
    let sources = expand_references(store, refs);
    let documents = load_documents(&sources);
    debug!(
        requested = refs.len(),
        loaded = documents.len(),
        "rule documents ready"
    );
    let results = hostguard_domain::evaluate(&documents, request, ctx);
    (documents, results)
}

fn envelope(
    started_at: OffsetDateTime,
    ctx: &AuditContext<'_>,
    rules: Vec<String>,
    report: AuditReport,
) -> ReportEnvelope {
    ReportEnvelope {
        schema: SCHEMA_AUDIT_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "hostguard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at: OffsetDateTime::now_utc(),
        host: RunHost {
            host_id: ctx.facts.host_id.clone(),
            os_identifier: ctx.facts.os_identifier.clone(),
            agent_version: ctx.facts.agent_version.clone(),
        },
        rules,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use hostguard_domain::host::HostFacts;
    use hostguard_domain::host::InstalledPackage;
    use hostguard_repo::DirRuleStore;
    use tempfile::TempDir;

    fn write_file(root: &Utf8Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn rules_root() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 path");
        write_file(
            &root,
            "cis/centos.yaml",
            r#"
package:
  blacklist:
    telnet:
      data:
        'CentOS*':
          - telnet: CIS-2.1.1
      description: telnet server must not be installed
  whitelist:
    rsyslog:
      data:
        'CentOS*':
          - rsyslog: CIS-5.1.1
      description: rsyslog must be installed
"#,
        );
        write_file(
            &root,
            "exceptions.yaml",
            "control:\n  - CIS-2.1.1: 'jump host, approved'\n",
        );
        write_file(
            &root,
            "top.yaml",
            r#"
audit:
  '*':
    - cis
  'G@os_family:RedHat':
    - exceptions: 'CIS-9*'
"#,
        );
        (tmp, root)
    }

    fn snapshot() -> HostSnapshot {
        HostSnapshot {
            facts: HostFacts {
                host_id: "web-01".to_string(),
                os_identifier: "CentOS Linux-7".to_string(),
                os_family: Some("RedHat".to_string()),
                ..HostFacts::default()
            },
            packages: Some(vec![InstalledPackage {
                name: "telnet".to_string(),
                version: "0.17".to_string(),
                architecture: None,
            }]),
            ..HostSnapshot::default()
        }
    }

    #[test]
    fn audit_reports_per_bucket_and_lists_loaded_rules() {
        let (_tmp, root) = rules_root();
        let store = DirRuleStore::new(root);
        let snap = snapshot();

        let out = with_snapshot_context(&snap, |ctx| {
            run_audit(
                &store,
                &[RuleRef::new("cis"), RuleRef::new("missing")],
                &AuditRequest::default(),
                &ReportOptions::default(),
                ctx,
            )
        });

        let env = out.envelope;
        assert_eq!(env.schema, SCHEMA_AUDIT_REPORT_V1);
        assert_eq!(env.host.host_id, "web-01");
        assert_eq!(env.rules, vec!["cis.centos".to_string()]);
        assert_eq!(env.report.failure.len(), 2);
        assert!(env.report.has_failures());
        assert!(env.started_at <= env.finished_at);
    }

    #[test]
    fn empty_reference_list_yields_empty_report() {
        let (_tmp, root) = rules_root();
        let store = DirRuleStore::new(root);
        let snap = snapshot();
        let out = with_snapshot_context(&snap, |ctx| {
            run_audit(&store, &[], &AuditRequest::default(), &ReportOptions::default(), ctx)
        });
        assert!(out.envelope.rules.is_empty());
        assert!(out.envelope.report.failure.is_empty());
        assert_eq!(out.envelope.report.success.as_deref().map(<[_]>::len), Some(0));
    }

    #[test]
    fn controls_from_another_topfile_group_apply() {
        let (_tmp, root) = rules_root();
        let store = DirRuleStore::new(root);
        let snap = snapshot();

        let out = with_snapshot_context(&snap, |ctx| {
            run_top(
                &store,
                &RuleRef::new("top"),
                &AuditRequest::default(),
                &ReportOptions::default(),
                ctx,
            )
        })
        .expect("run_top");

        let report = out.envelope.report;
        assert_eq!(out.envelope.rules, vec!["cis.centos", "exceptions"]);
        assert_eq!(report.failure.len(), 1);
        assert_eq!(report.failure[0].tag(), Some("CIS-5.1.1"));
        let controlled = report.controlled.expect("controlled bucket");
        assert_eq!(controlled.len(), 1);
        assert_eq!(controlled[0].tag(), Some("CIS-2.1.1"));
    }

    #[test]
    fn missing_topfile_is_fatal() {
        let (_tmp, root) = rules_root();
        let store = DirRuleStore::new(root);
        let snap = snapshot();
        let err = with_snapshot_context(&snap, |ctx| {
            run_top(
                &store,
                &RuleRef::new("nope"),
                &AuditRequest::default(),
                &ReportOptions::default(),
                ctx,
            )
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let tmp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 path");
        let resolved = load_config(Some(&root.join("hostguard.toml")), Overrides::default())
            .expect("defaults");
        assert_eq!(resolved.profile, "default");

        write_file(&root, "hostguard.toml", "profile = \"terse\"\n");
        let resolved = load_config(Some(&root.join("hostguard.toml")), Overrides::default())
            .expect("terse");
        assert!(!resolved.report.verbose);
    }
}
