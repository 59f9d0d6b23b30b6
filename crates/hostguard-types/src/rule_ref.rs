use camino::{Utf8Path, Utf8PathBuf};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical logical reference to a rule file or rule directory.
///
/// References are dot-separated (`cis.linux`), the way profiles are named in topfiles.
/// Normalization rules:
/// - a trailing `.yaml` is dropped
/// - path separators (`/`, `\`) become dots
/// - leading and trailing dots are trimmed
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct RuleRef(String);

impl RuleRef {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        let raw = s.as_ref().trim();
        let raw = raw.strip_suffix(".yaml").unwrap_or(raw);
        let v = raw.replace(['/', '\\'], ".");
        Self(v.trim_matches('.').to_string())
    }

    /// Build a reference from a path relative to a rule root (`cis/linux.yaml`).
    pub fn from_relative_path(path: &Utf8Path) -> Self {
        RuleRef::new(path.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The reference as a relative directory path (`cis/linux`).
    pub fn to_relative_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(self.0.replace('.', "/"))
    }

    /// The reference as a relative rule file path (`cis/linux.yaml`).
    pub fn to_relative_file(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.yaml", self.0.replace('.', "/")))
    }
}

impl std::fmt::Display for RuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
