use crate::{model::HostguardConfigV1, presets};
use anyhow::Context;
use globset::Glob;
use hostguard_domain::options::{AuditRequest, ReportOptions};

/// Topfile reference used when neither the config nor the CLI names one.
pub const DEFAULT_TOPFILE: &str = "top";

/// The only `schema` value a config file may declare.
pub const CONFIG_SCHEMA_V1: &str = "hostguard.config.v1";

/// Values supplied on the command line; `Some` wins over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub rules_root: Option<String>,
    pub topfile: Option<String>,
    pub tags: Option<String>,
    pub labels: Option<Vec<String>>,
    pub verbose: Option<bool>,
    pub show_success: Option<bool>,
    pub show_compliance: Option<bool>,
    pub debug: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub profile: String,
    pub rules_root: Option<String>,
    pub topfile: String,
    pub request: AuditRequest,
    pub report: ReportOptions,
}

pub fn resolve_config(
    cfg: HostguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = &cfg.schema
        && schema != CONFIG_SCHEMA_V1
    {
        anyhow::bail!("unsupported config schema: {schema} (expected {CONFIG_SCHEMA_V1})");
    }

    let profile = overrides
        .profile
        .or(cfg.profile)
        .unwrap_or_else(|| "default".to_string());

    let Some(mut report) = presets::preset(&profile) else {
        anyhow::bail!(
            "unknown profile: {profile} (expected {})",
            presets::PRESETS.join("|")
        );
    };
    if let Some(verbose) = overrides.verbose.or(cfg.verbose) {
        report.verbose = verbose;
    }
    if let Some(show_success) = overrides.show_success.or(cfg.show_success) {
        report.show_success = show_success;
    }
    if let Some(show_compliance) = overrides.show_compliance.or(cfg.show_compliance) {
        report.show_compliance = show_compliance;
    }

    let tags = overrides
        .tags
        .or(cfg.tags)
        .unwrap_or_else(|| "*".to_string());
    validate_tag_glob(&tags)?;

    let labels = overrides
        .labels
        .unwrap_or(cfg.labels)
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    let request = AuditRequest {
        tags,
        labels,
        debug: overrides.debug.or(cfg.debug).unwrap_or(false),
    };

    Ok(ResolvedConfig {
        profile,
        rules_root: overrides.rules_root.or(cfg.rules_root),
        topfile: overrides
            .topfile
            .or(cfg.topfile)
            .unwrap_or_else(|| DEFAULT_TOPFILE.to_string()),
        request,
        report,
    })
}

fn validate_tag_glob(pattern: &str) -> anyhow::Result<()> {
    Glob::new(pattern).with_context(|| format!("invalid tag glob: {pattern}"))?;
    Ok(())
}
