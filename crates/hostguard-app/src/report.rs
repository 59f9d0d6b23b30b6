use anyhow::Context;
use camino::Utf8Path;
use hostguard_types::{AuditReport, ReportEnvelope};

/// Exit code for a finished audit: 0 = no failures, 2 = at least one failure.
pub fn report_exit_code(report: &AuditReport) -> i32 {
    if report.has_failures() { 2 } else { 0 }
}

pub fn serialize_envelope(envelope: &ReportEnvelope) -> anyhow::Result<Vec<u8>> {
    let mut data = serde_json::to_vec_pretty(envelope).context("serialize report envelope")?;
    data.push(b'\n');
    Ok(data)
}

/// JSON schema of the report envelope, pretty-printed.
pub fn envelope_schema() -> anyhow::Result<String> {
    let schema = schemars::schema_for!(ReportEnvelope);
    serde_json::to_string_pretty(&schema).context("serialize report schema")
}

pub fn write_report(path: &Utf8Path, envelope: &ReportEnvelope) -> anyhow::Result<()> {
    let data = serialize_envelope(envelope)?;
    write_bytes(path, &data).with_context(|| format!("write report: {path}"))
}

pub fn write_text(path: &Utf8Path, text: &str) -> anyhow::Result<()> {
    write_bytes(path, text.as_bytes()).with_context(|| format!("write text: {path}"))
}

fn write_bytes(path: &Utf8Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory: {parent}"))?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
