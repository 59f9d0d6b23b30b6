use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Stable schema identifier for hostguard report envelopes.
pub const SCHEMA_AUDIT_REPORT_V1: &str = "hostguard.audit.v1";

/// Placeholder used when a terse entry has no description.
pub const NO_DESCRIPTION: &str = "<no description>";

/// Which side of a list-based rule section a check came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// The named item must not be present.
    Blacklist,
    /// The named item must be present.
    Whitelist,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Blacklist => "blacklist",
            ListKind::Whitelist => "whitelist",
        }
    }
}

/// The four result buckets of an audit run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Bucket {
    Success,
    Failure,
    Skipped,
    Controlled,
}

/// One check outcome, carrying the originating check data plus provider evidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditOutcome {
    /// Stable identifier under which the outcome is reported.
    pub tag: String,
    /// Check-type (`package`, `listening-port`, ...) or generic function name.
    pub module: String,

    /// Human-readable check id from the rule document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,
    /// The item the check is about (package name, setting name, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ListKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Rule reference (profile) the check was loaded from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Reason recorded for Controlled outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,

    /// Stable identifier intended for dedup and trending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// Check modifiers and provider evidence (kept open-ended for forward compatibility).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: JsonValue,
}

impl AuditOutcome {
    pub fn new(tag: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            module: module.into(),
            check_id: None,
            name: None,
            kind: None,
            description: None,
            labels: Vec::new(),
            profile: None,
            failure_reason: None,
            control: None,
            fingerprint: None,
            data: JsonValue::Null,
        }
    }

    /// Insert one evidence field into `data`, promoting it to an object if needed.
    pub fn insert_data(&mut self, key: &str, value: JsonValue) {
        if !self.data.is_object() {
            self.data = JsonValue::Object(serde_json::Map::new());
        }
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
    }

    /// `data.code`, if a provider recorded one.
    pub fn code(&self) -> Option<&str> {
        self.data.get("code").and_then(JsonValue::as_str)
    }
}

/// A report entry: the full outcome, or the reduced `{tag: description}` form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ReportEntry {
    Verbose(AuditOutcome),
    Terse(BTreeMap<String, String>),
}

impl ReportEntry {
    /// `{tag: control reason}` for controlled outcomes with a reason,
    /// `{tag: description}` otherwise.
    pub fn terse(outcome: &AuditOutcome) -> Self {
        let description = outcome
            .control
            .clone()
            .filter(|reason| !reason.is_empty())
            .or_else(|| outcome.description.clone())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        let mut m = BTreeMap::new();
        m.insert(outcome.tag.clone(), description);
        ReportEntry::Terse(m)
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            ReportEntry::Verbose(o) => Some(o.tag.as_str()),
            ReportEntry::Terse(m) => m.keys().next().map(String::as_str),
        }
    }
}

/// Final, post-processed audit report.
///
/// `Failure` is always present; the other buckets are dropped according to the
/// visibility options of the run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditReport {
    #[serde(rename = "Success", default, skip_serializing_if = "Option::is_none")]
    pub success: Option<Vec<ReportEntry>>,
    #[serde(rename = "Failure", default)]
    pub failure: Vec<ReportEntry>,
    #[serde(rename = "Skipped", default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Vec<ReportEntry>>,
    #[serde(rename = "Controlled", default, skip_serializing_if = "Option::is_none")]
    pub controlled: Option<Vec<ReportEntry>>,
    #[serde(rename = "Compliance", default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<String>,
}

impl AuditReport {
    pub fn has_failures(&self) -> bool {
        !self.failure.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunHost {
    pub host_id: String,
    pub os_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
}

/// Report envelope written by the CLI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportEnvelope {
    /// Versioned schema identifier for the envelope shape.
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub host: RunHost,
    /// Rule references that were evaluated, in order.
    pub rules: Vec<String>,
    pub report: AuditReport,
}
