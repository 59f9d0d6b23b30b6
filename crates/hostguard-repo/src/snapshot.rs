use anyhow::Context;
use camino::Utf8Path;
use hostguard_domain::error::ProbeError;
use hostguard_domain::host::{
    FunctionOutcome, FunctionRunner, HostFacts, HostProbes, InstalledPackage, LiveSocket,
    VulnerabilityFeed,
};
use hostguard_domain::model::{JsonMap, scalar_text};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

/// Recorded host state, loaded from YAML or JSON.
///
/// Sections left out of the file are reported as unsupported capabilities,
/// so a snapshot only needs what the audited rules actually probe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSnapshot {
    pub facts: HostFacts,
    pub packages: Option<Vec<InstalledPackage>>,
    pub sockets: Option<Vec<LiveSocket>>,
    pub policy_settings: Option<BTreeSet<String>>,
    pub domain_controller: Option<bool>,
    pub kernel: Option<BTreeMap<String, JsonValue>>,
    /// Raw output per platform query.
    pub probes: BTreeMap<String, String>,
    /// Recorded result per generic-check function name.
    pub functions: BTreeMap<String, RecordedFunction>,
    /// Vulnerability ids per formatted package string.
    pub vulnerabilities: Option<BTreeMap<String, Vec<String>>>,
}

/// Result of one function call: either an error message or an outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedFunction {
    Failed {
        error: String,
    },
    Completed {
        success: bool,
        #[serde(default)]
        data: JsonMap,
    },
}

impl HostSnapshot {
    /// The vulnerability feed, when the snapshot recorded one.
    pub fn vulnerability_feed(&self) -> Option<&dyn VulnerabilityFeed> {
        self.vulnerabilities
            .as_ref()
            .map(|_| self as &dyn VulnerabilityFeed)
    }
}

/// Load a snapshot file. JSON is accepted as a subset of YAML.
pub fn load_host_snapshot(path: &Utf8Path) -> anyhow::Result<HostSnapshot> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let snapshot: HostSnapshot =
        serde_yaml::from_str(&text).with_context(|| format!("parse host snapshot {path}"))?;
    Ok(snapshot)
}

fn unsupported(capability: &'static str) -> ProbeError {
    ProbeError::Unsupported { capability }
}

impl HostProbes for HostSnapshot {
    fn package_version(&self, name: &str) -> Result<Option<String>, ProbeError> {
        let packages = self
            .packages
            .as_ref()
            .ok_or_else(|| unsupported("package_version"))?;
        Ok(packages
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.version.clone()))
    }

    fn installed_packages(&self) -> Result<Vec<InstalledPackage>, ProbeError> {
        self.packages
            .clone()
            .ok_or_else(|| unsupported("installed_packages"))
    }

    fn live_sockets(&self) -> Result<Vec<LiveSocket>, ProbeError> {
        self.sockets.clone().ok_or_else(|| unsupported("live_sockets"))
    }

    fn current_policy_settings(&self) -> Result<BTreeSet<String>, ProbeError> {
        self.policy_settings
            .clone()
            .ok_or_else(|| unsupported("current_policy_settings"))
    }

    fn is_domain_controller(&self) -> Result<bool, ProbeError> {
        self.domain_controller
            .ok_or_else(|| unsupported("is_domain_controller"))
    }

    fn kernel_param(&self, name: &str) -> Result<Option<String>, ProbeError> {
        let kernel = self
            .kernel
            .as_ref()
            .ok_or_else(|| unsupported("kernel_param"))?;
        Ok(kernel.get(name).and_then(scalar_text))
    }

    fn run_probe(&self, command: &str) -> Result<String, ProbeError> {
        self.probes
            .get(command)
            .cloned()
            .ok_or_else(|| unsupported("run_probe"))
    }
}

impl FunctionRunner for HostSnapshot {
    fn run(
        &self,
        function: &str,
        _args: &[JsonValue],
        _kwargs: &JsonMap,
    ) -> Result<FunctionOutcome, ProbeError> {
        match self.functions.get(function) {
            Some(RecordedFunction::Completed { success, data }) => Ok(FunctionOutcome {
                success: *success,
                data: data.clone(),
            }),
            Some(RecordedFunction::Failed { error }) => {
                Err(ProbeError::failed(function, error.clone()))
            }
            None => Err(ProbeError::failed(function, "no recorded result")),
        }
    }
}

impl VulnerabilityFeed for HostSnapshot {
    fn audit(
        &self,
        _os: &str,
        _release: &str,
        packages: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, ProbeError> {
        let known = self
            .vulnerabilities
            .as_ref()
            .ok_or_else(|| unsupported("vulnerability_feed"))?;
        Ok(packages
            .iter()
            .filter_map(|p| known.get(p).map(|ids| (p.clone(), ids.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
facts:
  id: web-01
  osfinger: CentOS Linux-7
  os_family: RedHat
  osrelease: "7"
packages:
  - name: telnet
    version: "0.17"
    architecture: x86_64
sockets:
  - local-address: 0.0.0.0:22
    program: sshd
kernel:
  net.ipv4.ip_forward: 0
functions:
  grep:
    success: true
    data: {matched: 1}
  stat:
    error: permission denied
vulnerabilities:
  telnet-0.17.x86_64: [CVE-2020-10188]
"#;

    #[test]
    fn snapshot_answers_recorded_probes() {
        let snap: HostSnapshot = serde_yaml::from_str(SNAPSHOT).unwrap();
        assert_eq!(snap.facts.host_id, "web-01");
        assert_eq!(snap.facts.os_identifier, "CentOS Linux-7");
        assert_eq!(snap.package_version("telnet").unwrap().as_deref(), Some("0.17"));
        assert_eq!(snap.package_version("rsh").unwrap(), None);
        assert_eq!(snap.live_sockets().unwrap()[0].program.as_deref(), Some("sshd"));
        assert_eq!(
            snap.kernel_param("net.ipv4.ip_forward").unwrap().as_deref(),
            Some("0")
        );
    }

    #[test]
    fn missing_sections_are_unsupported() {
        let snap: HostSnapshot = serde_yaml::from_str(SNAPSHOT).unwrap();
        assert!(snap.current_policy_settings().unwrap_err().is_unsupported());
        assert!(snap.is_domain_controller().unwrap_err().is_unsupported());
        assert!(snap.run_probe("auditpol").unwrap_err().is_unsupported());

        let empty = HostSnapshot::default();
        assert!(empty.vulnerability_feed().is_none());
        assert!(empty.installed_packages().unwrap_err().is_unsupported());
    }

    #[test]
    fn recorded_functions_replay() {
        let snap: HostSnapshot = serde_yaml::from_str(SNAPSHOT).unwrap();
        let ok = snap.run("grep", &[], &JsonMap::new()).unwrap();
        assert!(ok.success);
        assert_eq!(ok.data["matched"], 1);

        let err = snap.run("stat", &[], &JsonMap::new()).unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert!(snap.run("unknown", &[], &JsonMap::new()).is_err());
    }

    #[test]
    fn vulnerability_feed_reports_only_known_packages() {
        let snap: HostSnapshot = serde_yaml::from_str(SNAPSHOT).unwrap();
        let feed = snap.vulnerability_feed().unwrap();
        let found = feed
            .audit(
                "centos",
                "7",
                &["telnet-0.17.x86_64".to_string(), "bash-4.2.x86_64".to_string()],
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["telnet-0.17.x86_64"], vec!["CVE-2020-10188"]);
    }
}
