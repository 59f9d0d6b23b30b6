use crate::error::ProbeError;
use crate::host::{
    AuditContext, FunctionOutcome, FunctionRunner, HostFacts, HostProbes, InstalledPackage,
    LiveSocket, TargetMatcher, VulnerabilityFeed,
};
use crate::model::{
    EntryShape, JsonMap, ListSection, RuleDefinition, RuleDocument, RuleEntry, TagValue,
    VariantBlock, VariantEntry,
};
use crate::options::AuditRequest;
use crate::target::FactTargetMatcher;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

pub fn labels(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Rule entry with scalar-tag variants: `[(pattern, [(name, tag)])]`.
pub fn entry(check_id: &str, label_list: &[&str], variants: &[(&str, &[(&str, &str)])]) -> RuleEntry {
    RuleEntry {
        check_id: check_id.to_string(),
        definition: RuleDefinition {
            variants: variants
                .iter()
                .map(|(pattern, entries)| VariantBlock {
                    pattern: pattern.to_string(),
                    shape: EntryShape::List,
                    entries: entries
                        .iter()
                        .map(|(name, tag)| VariantEntry {
                            name: name.to_string(),
                            value: TagValue::Tag(tag.to_string()),
                        })
                        .collect(),
                })
                .collect(),
            labels: labels(label_list),
            ..RuleDefinition::default()
        },
        profile: None,
    }
}

/// Rule entry with one `*` variant whose value is a structured modifier map.
pub fn structured_entry(check_id: &str, name: &str, value: JsonValue) -> RuleEntry {
    let map: JsonMap = value.as_object().cloned().unwrap_or_default();
    RuleEntry {
        check_id: check_id.to_string(),
        definition: RuleDefinition {
            variants: vec![VariantBlock {
                pattern: "*".to_string(),
                shape: EntryShape::List,
                entries: vec![VariantEntry {
                    name: name.to_string(),
                    value: TagValue::Structured(map),
                }],
            }],
            ..RuleDefinition::default()
        },
        profile: None,
    }
}

pub fn section(blacklist: Vec<RuleEntry>, whitelist: Vec<RuleEntry>) -> ListSection {
    ListSection {
        blacklist,
        whitelist,
    }
}

pub fn doc_with_packages(blacklist: Vec<RuleEntry>, whitelist: Vec<RuleEntry>) -> RuleDocument {
    RuleDocument {
        package: section(blacklist, whitelist),
        ..RuleDocument::default()
    }
}

pub fn request(tags: &str, label_list: &[&str]) -> AuditRequest {
    AuditRequest {
        tags: tags.to_string(),
        labels: labels(label_list),
        debug: false,
    }
}

pub fn facts(os_identifier: &str) -> HostFacts {
    HostFacts {
        host_id: "test-host".to_string(),
        os_identifier: os_identifier.to_string(),
        os_name: Some("CentOS".to_string()),
        os_family: Some("RedHat".to_string()),
        os_release: Some("7".to_string()),
        architecture: Some("x86_64".to_string()),
        agent_version: Some("3.0.7".to_string()),
        extra: BTreeMap::new(),
    }
}

/// In-memory host used by the engine tests.
#[derive(Clone, Debug, Default)]
pub struct FakeHost {
    pub packages: BTreeMap<String, String>,
    pub sockets: Option<Vec<LiveSocket>>,
    pub settings: Option<BTreeSet<String>>,
    pub domain_controller: bool,
    pub kernel: BTreeMap<String, String>,
    pub probe_output: Option<String>,
    pub functions: BTreeMap<String, Result<FunctionOutcome, String>>,
    pub vulnerable: BTreeMap<String, Vec<String>>,
    pub fail_packages: bool,
}

impl FakeHost {
    pub fn with_packages(packages: &[(&str, &str)]) -> Self {
        Self {
            packages: packages
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            ..Self::default()
        }
    }
}

impl HostProbes for FakeHost {
    fn package_version(&self, name: &str) -> Result<Option<String>, ProbeError> {
        if self.fail_packages {
            return Err(ProbeError::failed("package_version", "rpm database locked"));
        }
        Ok(self.packages.get(name).cloned())
    }

    fn installed_packages(&self) -> Result<Vec<InstalledPackage>, ProbeError> {
        Ok(self
            .packages
            .iter()
            .map(|(name, version)| InstalledPackage {
                name: name.clone(),
                version: version.clone(),
                architecture: Some("x86_64".to_string()),
            })
            .collect())
    }

    fn live_sockets(&self) -> Result<Vec<LiveSocket>, ProbeError> {
        self.sockets
            .clone()
            .ok_or_else(|| ProbeError::failed("live_sockets", "netstat unavailable"))
    }

    fn current_policy_settings(&self) -> Result<BTreeSet<String>, ProbeError> {
        self.settings.clone().ok_or(ProbeError::Unsupported {
            capability: "current_policy_settings",
        })
    }

    fn is_domain_controller(&self) -> Result<bool, ProbeError> {
        Ok(self.domain_controller)
    }

    fn kernel_param(&self, name: &str) -> Result<Option<String>, ProbeError> {
        Ok(self.kernel.get(name).cloned())
    }

    fn run_probe(&self, command: &str) -> Result<String, ProbeError> {
        self.probe_output
            .clone()
            .ok_or_else(|| ProbeError::failed(command, "no output"))
    }
}

impl FunctionRunner for FakeHost {
    fn run(
        &self,
        function: &str,
        _args: &[JsonValue],
        _kwargs: &JsonMap,
    ) -> Result<FunctionOutcome, ProbeError> {
        match self.functions.get(function) {
            Some(Ok(outcome)) => Ok(outcome.clone()),
            Some(Err(message)) => Err(ProbeError::failed(function, message.clone())),
            None => Err(ProbeError::failed(function, "unknown function")),
        }
    }
}

impl VulnerabilityFeed for FakeHost {
    fn audit(
        &self,
        _os: &str,
        _release: &str,
        packages: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, ProbeError> {
        Ok(packages
            .iter()
            .filter_map(|p| self.vulnerable.get(p).map(|ids| (p.clone(), ids.clone())))
            .collect())
    }
}

/// Build a context where every capability is served by `host`.
pub fn with_context<R>(
    facts: &HostFacts,
    host: &FakeHost,
    vulnerabilities: bool,
    f: impl FnOnce(&AuditContext<'_>) -> R,
) -> R {
    let targets = FactTargetMatcher::new(facts);
    let ctx = AuditContext {
        facts,
        probes: host,
        targets: &targets as &dyn TargetMatcher,
        functions: host,
        vulnerabilities: if vulnerabilities {
            Some(host as &dyn VulnerabilityFeed)
        } else {
            None
        },
    };
    f(&ctx)
}
