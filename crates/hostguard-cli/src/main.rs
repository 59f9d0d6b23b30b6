//! CLI entry point for hostguard.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, and exit codes.
//! All business logic lives in the `hostguard-app` crate.

mod logging;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use hostguard_app::{
    AuditOutput, envelope_schema, load_config, report_exit_code, run_audit, run_top,
    serialize_envelope, with_snapshot_context, write_report, write_text,
};
use hostguard_domain::host::AuditContext;
use hostguard_repo::{DirRuleStore, load_host_snapshot};
use hostguard_settings::{Overrides, ResolvedConfig};
use hostguard_types::RuleRef;
use logging::LogConfig;
use std::io::Write;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "hostguard",
    version,
    about = "Declarative, OS-aware compliance audits for hosts"
)]
struct Cli {
    /// Directory rule references are resolved against (default: config value, else `.`).
    #[arg(long, global = true)]
    rules_root: Option<Utf8PathBuf>,

    /// Path to hostguard config TOML. A missing file means defaults.
    #[arg(long, global = true, default_value = "hostguard.toml")]
    config: Utf8PathBuf,

    /// Recorded host state (YAML or JSON) to audit.
    #[arg(long, global = true)]
    host: Option<Utf8PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit the host against explicit rule references.
    Audit {
        /// Rule references (`cis.linux`) or directories of rule files.
        #[arg(required = true)]
        rules: Vec<String>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Audit the host against the rules its topfile selects.
    Top {
        /// Topfile reference (default: config value, else `top`).
        #[arg(long)]
        topfile: Option<String>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Print the JSON schema of the report envelope.
    Schema {
        /// Write the schema to a file instead of stdout.
        #[arg(long, short)]
        output: Option<Utf8PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
struct ReportArgs {
    /// Only run checks whose tag matches this glob.
    #[arg(long)]
    tags: Option<String>,

    /// Only run checks carrying all of these labels.
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    /// Output preset (default|terse|failures).
    #[arg(long)]
    profile: Option<String>,

    /// Collapse each outcome to `{tag: description}`.
    #[arg(long)]
    terse: bool,

    /// Drop the Success and Skipped buckets.
    #[arg(long)]
    hide_success: bool,

    /// Add the compliance percentage.
    #[arg(long)]
    compliance: bool,

    /// Log merged rules and tag indexes at debug level.
    #[arg(long)]
    debug: bool,

    /// Where to write the JSON report (default: stdout).
    #[arg(long)]
    report_out: Option<Utf8PathBuf>,
}

impl ReportArgs {
    fn overrides(&self, cli: &Cli, topfile: Option<String>) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            rules_root: cli.rules_root.as_ref().map(|p| p.to_string()),
            topfile,
            tags: self.tags.clone(),
            labels: (!self.labels.is_empty()).then(|| self.labels.clone()),
            verbose: self.terse.then_some(false),
            show_success: self.hide_success.then_some(false),
            show_compliance: self.compliance.then_some(true),
            debug: self.debug.then_some(true),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(
        &LogConfig::default()
            .level(cli.log_level.clone())
            .json(cli.log_json),
    );

    match run(&cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("hostguard error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.cmd {
        Commands::Audit { rules, report } => {
            let overrides = report.overrides(cli, None);
            let resolved = load_config(Some(cli.config.as_path()), overrides)?;
            let refs: Vec<RuleRef> = rules.iter().map(RuleRef::new).collect();
            cmd_audit(cli, &resolved, report, |store, ctx| {
                Ok(run_audit(store, &refs, &resolved.request, &resolved.report, ctx))
            })
        }
        Commands::Top { topfile, report } => {
            let overrides = report.overrides(cli, topfile.clone());
            let resolved = load_config(Some(cli.config.as_path()), overrides)?;
            let topfile = RuleRef::new(&resolved.topfile);
            cmd_audit(cli, &resolved, report, |store, ctx| {
                run_top(store, &topfile, &resolved.request, &resolved.report, ctx)
            })
        }
        Commands::Schema { output } => {
            let schema = envelope_schema()?;
            match output {
                Some(path) => write_text(path, &format!("{schema}\n"))?,
                None => println!("{schema}"),
            }
            Ok(0)
        }
    }
}

fn cmd_audit(
    cli: &Cli,
    resolved: &ResolvedConfig,
    report: &ReportArgs,
    audit: impl FnOnce(&DirRuleStore, &AuditContext<'_>) -> anyhow::Result<AuditOutput>,
) -> anyhow::Result<i32> {
    let host_path = cli
        .host
        .as_deref()
        .context("--host <FILE> is required to run an audit")?;
    let snapshot = load_host_snapshot(host_path)?;

    let rules_root = resolved
        .rules_root
        .as_deref()
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let store = DirRuleStore::new(rules_root);
    info!(
        host = %snapshot.facts.host_id,
        os = %snapshot.facts.os_identifier,
        rules_root = %store.root(),
        "starting audit"
    );

    let output = with_snapshot_context(&snapshot, |ctx| audit(&store, ctx))?;

    match &report.report_out {
        Some(path) => write_report(path, &output.envelope).context("write report json")?,
        None => {
            let data = serialize_envelope(&output.envelope)?;
            std::io::stdout()
                .lock()
                .write_all(&data)
                .context("write report to stdout")?;
        }
    }
    Ok(report_exit_code(&output.envelope.report))
}
