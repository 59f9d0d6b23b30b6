//! Capabilities the engine consumes from the host.
//!
//! Everything that touches live state sits behind these traits so the engine
//! can run against a recorded snapshot or test doubles.

use crate::error::ProbeError;
use crate::model::{JsonMap, scalar_text};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

/// Read-only host metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostFacts {
    #[serde(alias = "id")]
    pub host_id: String,
    /// OS identifier matched against variant patterns, e.g. `CentOS Linux-7`.
    #[serde(alias = "osfinger")]
    pub os_identifier: String,
    #[serde(alias = "os")]
    pub os_name: Option<String>,
    pub os_family: Option<String>,
    #[serde(alias = "osrelease")]
    pub os_release: Option<String>,
    #[serde(alias = "osarch")]
    pub architecture: Option<String>,
    /// Version of the running agent, used by version-gated checks.
    #[serde(alias = "hubble_version")]
    pub agent_version: Option<String>,
    pub extra: BTreeMap<String, JsonValue>,
}

impl HostFacts {
    /// Values of fact `key` as text. List facts yield one value per item.
    pub fn fact_values(&self, key: &str) -> Vec<String> {
        let known = match key {
            "id" | "host_id" => Some(self.host_id.clone()),
            "osfinger" | "os_identifier" => Some(self.os_identifier.clone()),
            "os" | "os_name" => self.os_name.clone(),
            "os_family" => self.os_family.clone(),
            "osrelease" | "os_release" => self.os_release.clone(),
            "osarch" | "architecture" => self.architecture.clone(),
            "hubble_version" | "agent_version" => self.agent_version.clone(),
            _ => None,
        };
        if let Some(v) = known {
            return vec![v];
        }
        match self.extra.get(key) {
            Some(JsonValue::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(v) => scalar_text(v).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

/// One observed listening socket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveSocket {
    #[serde(rename = "local-address", alias = "local_address")]
    pub local_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Low-level state probes. Capabilities a host does not provide keep the
/// default implementation and report [`ProbeError::Unsupported`].
pub trait HostProbes {
    /// Installed version of `name`, or `None` when the package is absent.
    fn package_version(&self, name: &str) -> Result<Option<String>, ProbeError> {
        let _ = name;
        Err(ProbeError::Unsupported {
            capability: "package_version",
        })
    }

    fn installed_packages(&self) -> Result<Vec<InstalledPackage>, ProbeError> {
        Err(ProbeError::Unsupported {
            capability: "installed_packages",
        })
    }

    fn live_sockets(&self) -> Result<Vec<LiveSocket>, ProbeError> {
        Err(ProbeError::Unsupported {
            capability: "live_sockets",
        })
    }

    fn current_policy_settings(&self) -> Result<BTreeSet<String>, ProbeError> {
        Err(ProbeError::Unsupported {
            capability: "current_policy_settings",
        })
    }

    fn is_domain_controller(&self) -> Result<bool, ProbeError> {
        Err(ProbeError::Unsupported {
            capability: "is_domain_controller",
        })
    }

    /// Current value of a kernel parameter, `None` when it does not exist.
    fn kernel_param(&self, name: &str) -> Result<Option<String>, ProbeError> {
        let _ = name;
        Err(ProbeError::Unsupported {
            capability: "kernel_param",
        })
    }

    /// Run a platform query and return its raw text output.
    fn run_probe(&self, command: &str) -> Result<String, ProbeError> {
        let _ = command;
        Err(ProbeError::Unsupported {
            capability: "run_probe",
        })
    }
}

/// Evaluates host-targeting expressions.
pub trait TargetMatcher {
    fn matches(&self, expression: &str) -> bool;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionOutcome {
    pub success: bool,
    pub data: JsonMap,
}

/// Executes the function named by a generic check.
pub trait FunctionRunner {
    fn run(
        &self,
        function: &str,
        args: &[JsonValue],
        kwargs: &JsonMap,
    ) -> Result<FunctionOutcome, ProbeError>;
}

/// Vulnerability lookup for a formatted package list.
pub trait VulnerabilityFeed {
    /// Returns vulnerability ids per vulnerable package; packages absent from
    /// the map are considered secure.
    fn audit(
        &self,
        os: &str,
        release: &str,
        packages: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, ProbeError>;
}

/// Everything an audit run needs to know about the host, passed explicitly.
#[derive(Clone, Copy)]
pub struct AuditContext<'a> {
    pub facts: &'a HostFacts,
    pub probes: &'a dyn HostProbes,
    pub targets: &'a dyn TargetMatcher,
    pub functions: &'a dyn FunctionRunner,
    pub vulnerabilities: Option<&'a dyn VulnerabilityFeed>,
}

impl<'a> AuditContext<'a> {
    pub fn os_identifier(&self) -> &'a str {
        &self.facts.os_identifier
    }
}
