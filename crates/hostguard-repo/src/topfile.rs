//! Topfiles map host-targeting expressions to the rule references that apply
//! to matching hosts:
//!
//! ```yaml
//! audit:
//!   '*':
//!     - cis.linux
//!     - exceptions: 'CIS-*'
//!   'G@os_family:RedHat':
//!     - cis.centos
//! ```
//!
//! A `{reference: glob}` entry audits that reference with its own tag glob.

use crate::parse::yaml_to_json;
use crate::store::RuleStore;
use camino::Utf8PathBuf;
use hostguard_domain::host::TargetMatcher;
use hostguard_domain::model::scalar_text;
use hostguard_types::RuleRef;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

const TOP_KEY: &str = "audit";

#[derive(Debug, Error)]
pub enum TopfileError {
    #[error("topfile '{reference}' not found")]
    NotFound { reference: String },

    #[error("could not fetch topfile '{reference}': {message}")]
    Fetch { reference: String, message: String },

    #[error("read topfile {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("topfile is malformed: {reason}")]
    Malformed { reason: String },
}

impl TopfileError {
    fn malformed(reason: impl Into<String>) -> Self {
        TopfileError::Malformed {
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topfile {
    pub targets: Vec<TopTarget>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopTarget {
    pub expression: String,
    pub entries: Vec<TopEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopEntry {
    pub rule: RuleRef,
    /// Tag glob for this reference; `None` uses the caller's glob.
    pub tags: Option<String>,
}

impl Topfile {
    /// References of every target matching this host, grouped by effective
    /// tag glob. Groups keep first-seen order and contain no duplicates.
    pub fn select(
        &self,
        matcher: &dyn TargetMatcher,
        default_tags: &str,
    ) -> Vec<(String, Vec<RuleRef>)> {
        let mut groups: Vec<(String, Vec<RuleRef>)> = Vec::new();
        for target in &self.targets {
            if !matcher.matches(&target.expression) {
                debug!(target = %target.expression, "topfile target does not match this host");
                continue;
            }
            for entry in &target.entries {
                let tags = entry.tags.as_deref().unwrap_or(default_tags);
                let idx = match groups.iter().position(|(t, _)| t == tags) {
                    Some(idx) => idx,
                    None => {
                        groups.push((tags.to_string(), Vec::new()));
                        groups.len() - 1
                    }
                };
                let refs = &mut groups[idx].1;
                if !refs.contains(&entry.rule) {
                    refs.push(entry.rule.clone());
                }
            }
        }
        groups
    }
}

/// Parse topfile YAML text.
pub fn parse_topfile(text: &str) -> Result<Topfile, TopfileError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| TopfileError::malformed(e.to_string()))?;
    let root = yaml_to_json(yaml);

    let Some(section) = root.as_object().and_then(|m| m.get(TOP_KEY)) else {
        return Err(TopfileError::malformed(format!("missing top-level '{TOP_KEY}' key")));
    };
    let Some(section) = section.as_object() else {
        return Err(TopfileError::malformed(format!("'{TOP_KEY}' must be a mapping")));
    };

    let mut targets = Vec::with_capacity(section.len());
    for (expression, items) in section {
        let items: &[JsonValue] = match items {
            JsonValue::Array(items) => items.as_slice(),
            JsonValue::Null => &[],
            _ => {
                return Err(TopfileError::malformed(format!(
                    "target '{expression}' must list rule references"
                )));
            }
        };
        let entries = items
            .iter()
            .map(|item| parse_entry(expression, item))
            .collect::<Result<Vec<_>, _>>()?;
        targets.push(TopTarget {
            expression: expression.clone(),
            entries,
        });
    }
    Ok(Topfile { targets })
}

fn parse_entry(expression: &str, item: &JsonValue) -> Result<TopEntry, TopfileError> {
    if let Some(rule) = scalar_text(item) {
        return Ok(TopEntry {
            rule: RuleRef::new(rule),
            tags: None,
        });
    }
    if let Some(map) = item.as_object()
        && map.len() == 1
        && let Some((rule, tags)) = map.iter().next()
        && let Some(tags) = scalar_text(tags)
    {
        return Ok(TopEntry {
            rule: RuleRef::new(rule),
            tags: Some(tags),
        });
    }
    Err(TopfileError::malformed(format!(
        "entry under '{expression}' must be a reference or {{reference: tag_glob}}"
    )))
}

/// Fetch and parse the topfile named by `rule`. Every failure is fatal.
pub fn load_topfile(store: &dyn RuleStore, rule: &RuleRef) -> Result<Topfile, TopfileError> {
    let path = store
        .fetch(rule)
        .map_err(|e| TopfileError::Fetch {
            reference: rule.to_string(),
            message: format!("{e:#}"),
        })?
        .filter(|p| p.is_file())
        .ok_or_else(|| TopfileError::NotFound {
            reference: rule.to_string(),
        })?;
    let text = std::fs::read_to_string(&path).map_err(|source| TopfileError::Read {
        path: path.clone(),
        source,
    })?;
    parse_topfile(&text)
}
