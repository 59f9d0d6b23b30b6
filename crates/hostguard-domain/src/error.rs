use thiserror::Error;

/// Structural problems in a rule document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule document must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    #[error("section '{section}' must be a mapping")]
    InvalidSection { section: String },

    #[error("definition '{check_id}' in '{section}' is malformed: {reason}")]
    InvalidDefinition {
        section: String,
        check_id: String,
        reason: String,
    },
}

/// Failure of a host capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("host probe '{capability}' is not supported on this host")]
    Unsupported { capability: &'static str },

    #[error("host probe '{probe}' failed: {message}")]
    Failed { probe: String, message: String },
}

impl ProbeError {
    pub fn failed(probe: impl Into<String>, message: impl Into<String>) -> Self {
        ProbeError::Failed {
            probe: probe.into(),
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ProbeError::Unsupported { .. })
    }
}

/// A host version string that does not follow the strict dotted-numeric form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid version '{version}': expected N.N or N.N.N")]
pub struct VersionError {
    pub version: String,
}
