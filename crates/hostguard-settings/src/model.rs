use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `hostguard.toml` schema v1.
///
/// Every key is optional; anything left out falls back to the selected preset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HostguardConfigV1 {
    /// Optional schema marker; must be `hostguard.config.v1` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Output preset: `default`, `terse` or `failures`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Directory rule references are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_root: Option<String>,

    /// Rule reference of the topfile used by `hostguard top`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topfile: Option<String>,

    /// Tag glob applied to every check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    /// Checks must carry all of these labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_compliance: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}
