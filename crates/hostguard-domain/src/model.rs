//! In-memory form of a rule document.
//!
//! Documents arrive as loosely typed YAML; [`RuleDocument::from_value`] turns
//! them into these types. Whole-document problems are errors, problems local to
//! one definition are logged and that definition is dropped.

use crate::error::RuleError;
use hostguard_types::{ListKind, ids};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use tracing::warn;

pub type JsonMap = Map<String, JsonValue>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleDocument {
    pub package: ListSection,
    pub policy_setting: ListSection,
    pub kernel_param: ListSection,
    pub listening_port: Vec<PortRule>,
    /// Present when at least one document enables the vulnerability lookup.
    pub vulnerability: Option<VulnerabilitySettings>,
    pub controls: Vec<ControlEntry>,
    pub generic: Vec<GenericCheck>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListSection {
    pub blacklist: Vec<RuleEntry>,
    pub whitelist: Vec<RuleEntry>,
}

impl ListSection {
    pub fn is_empty(&self) -> bool {
        self.blacklist.is_empty() && self.whitelist.is_empty()
    }

    pub fn entries(&self, kind: ListKind) -> &[RuleEntry] {
        match kind {
            ListKind::Blacklist => &self.blacklist,
            ListKind::Whitelist => &self.whitelist,
        }
    }

    pub fn entries_mut(&mut self, kind: ListKind) -> &mut Vec<RuleEntry> {
        match kind {
            ListKind::Blacklist => &mut self.blacklist,
            ListKind::Whitelist => &mut self.whitelist,
        }
    }

    /// Blacklist entries first, then whitelist entries.
    pub fn iter(&self) -> impl Iterator<Item = (ListKind, &RuleEntry)> {
        self.blacklist
            .iter()
            .map(|e| (ListKind::Blacklist, e))
            .chain(self.whitelist.iter().map(|e| (ListKind::Whitelist, e)))
    }
}

/// One check-id in a blacklist or whitelist, with the profile it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleEntry {
    pub check_id: String,
    pub definition: RuleDefinition,
    pub profile: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleDefinition {
    /// OS-identifier pattern blocks, in document order.
    pub variants: Vec<VariantBlock>,
    pub description: Option<String>,
    pub labels: BTreeSet<String>,
    pub alert: Option<JsonValue>,
    pub trigger: Option<JsonValue>,
    /// `Some(reason)` marks every instance as controlled (never executed).
    pub control: Option<String>,
    pub extra: JsonMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryShape {
    /// `- name: tag` items.
    List,
    /// `name: tag` pairs written directly under the pattern.
    FlatMapping,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariantBlock {
    /// Comma separated glob list, or `*`.
    pub pattern: String,
    pub shape: EntryShape,
    pub entries: Vec<VariantEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariantEntry {
    pub name: String,
    pub value: TagValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    Tag(String),
    /// `{tag: ..., version: ..., run_on_dc: ...}`
    Structured(JsonMap),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PortRule {
    pub check_id: String,
    pub addresses: Vec<String>,
    pub description: Option<String>,
    pub labels: BTreeSet<String>,
    pub profile: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VulnerabilitySettings {
    pub settings: JsonMap,
    pub profile: Option<String>,
}

/// Compensating control: failures carrying `tag` become controlled.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlEntry {
    pub tag: String,
    pub reason: String,
    pub profile: Option<String>,
}

/// A `<check-id>: { <function>: {...} }` check executed through the function runner.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericCheck {
    pub check_id: String,
    pub function: String,
    pub args: Vec<JsonValue>,
    pub kwargs: JsonMap,
    pub tag: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub target: String,
    pub labels: BTreeSet<String>,
    pub control: Option<String>,
    pub extra: JsonMap,
    pub profile: Option<String>,
}

impl RuleDocument {
    pub fn from_value(value: &JsonValue) -> Result<Self, RuleError> {
        let root = match value {
            JsonValue::Object(map) => map,
            JsonValue::Null => return Ok(Self::default()),
            other => {
                return Err(RuleError::NotAMapping {
                    found: json_kind(other),
                });
            }
        };

        let mut doc = RuleDocument::default();
        for (key, section) in root {
            match key.as_str() {
                ids::MODULE_PACKAGE => doc.package = parse_list_section(key, section, false)?,
                ids::MODULE_POLICY_SETTING => {
                    doc.policy_setting = parse_list_section(key, section, false)?
                }
                ids::MODULE_KERNEL_PARAM => {
                    doc.kernel_param = parse_list_section(key, section, true)?
                }
                ids::MODULE_LISTENING_PORT => doc.listening_port = parse_ports(key, section)?,
                ids::MODULE_VULNERABILITY => {
                    doc.vulnerability = Some(VulnerabilitySettings {
                        settings: section.as_object().cloned().unwrap_or_default(),
                        profile: None,
                    })
                }
                ids::SECTION_CONTROL => doc.controls = parse_controls(section),
                _ => match parse_generic(key, section) {
                    Ok(check) => doc.generic.push(check),
                    Err(err) => warn!(check_id = %key, error = %err, "skipping malformed check"),
                },
            }
        }
        Ok(doc)
    }

    /// Every profile name attached to this document's entries, deduplicated.
    pub fn profiles(&self) -> BTreeSet<&str> {
        let lists = [&self.package, &self.policy_setting, &self.kernel_param]
            .into_iter()
            .flat_map(|s| s.iter().map(|(_, e)| e.profile.as_deref()));
        let ports = self.listening_port.iter().map(|p| p.profile.as_deref());
        let generic = self.generic.iter().map(|g| g.profile.as_deref());
        lists.chain(ports).chain(generic).flatten().collect()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "mapping",
    }
}

/// Render a YAML scalar (string, number, bool) as text.
pub fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_set(value: Option<&JsonValue>) -> BTreeSet<String> {
    match value {
        Some(JsonValue::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(v) => scalar_text(v).into_iter().collect(),
        None => BTreeSet::new(),
    }
}

pub(crate) fn control_reason(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::Bool(true) => Some(String::new()),
        other => Some(scalar_text(other).unwrap_or_else(|| other.to_string())),
    }
}

fn parse_list_section(
    section: &str,
    value: &JsonValue,
    allow_flat: bool,
) -> Result<ListSection, RuleError> {
    let map = match value {
        JsonValue::Object(map) => map,
        JsonValue::Null => return Ok(ListSection::default()),
        _ => {
            return Err(RuleError::InvalidSection {
                section: section.to_string(),
            });
        }
    };

    let mut out = ListSection::default();
    let structured = map.contains_key("blacklist") || map.contains_key("whitelist");
    if allow_flat && !structured {
        out.whitelist = parse_definitions(section, map);
        return Ok(out);
    }

    for (key, entries) in map {
        let kind = match key.as_str() {
            "blacklist" => ListKind::Blacklist,
            "whitelist" => ListKind::Whitelist,
            other => {
                warn!(section, key = other, "ignoring unknown list in section");
                continue;
            }
        };
        match entries {
            JsonValue::Object(defs) => *out.entries_mut(kind) = parse_definitions(section, defs),
            JsonValue::Null => {}
            _ => {
                return Err(RuleError::InvalidSection {
                    section: format!("{section}.{}", kind.as_str()),
                });
            }
        }
    }
    Ok(out)
}

fn parse_definitions(section: &str, defs: &JsonMap) -> Vec<RuleEntry> {
    let mut out = Vec::with_capacity(defs.len());
    for (check_id, raw) in defs {
        match parse_definition(section, check_id, raw) {
            Ok(definition) => out.push(RuleEntry {
                check_id: check_id.clone(),
                definition,
                profile: None,
            }),
            Err(err) => warn!(error = %err, "skipping rule definition"),
        }
    }
    out
}

fn parse_definition(
    section: &str,
    check_id: &str,
    raw: &JsonValue,
) -> Result<RuleDefinition, RuleError> {
    let invalid = |reason: &str| RuleError::InvalidDefinition {
        section: section.to_string(),
        check_id: check_id.to_string(),
        reason: reason.to_string(),
    };
    let JsonValue::Object(body) = raw else {
        return Err(invalid("expected a mapping"));
    };

    let mut def = RuleDefinition::default();
    for (key, value) in body {
        match key.as_str() {
            "data" | "variants" => {
                let JsonValue::Object(blocks) = value else {
                    return Err(invalid("variants must be a mapping of OS patterns"));
                };
                def.variants = blocks
                    .iter()
                    .filter_map(|(pattern, entries)| parse_variant_block(check_id, pattern, entries))
                    .collect();
            }
            "description" => def.description = scalar_text(value),
            "labels" => def.labels = string_set(Some(value)),
            "alert" => def.alert = Some(value.clone()),
            "trigger" => def.trigger = Some(value.clone()),
            "control" => def.control = control_reason(value),
            _ => {
                def.extra.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(def)
}

fn parse_variant_block(check_id: &str, pattern: &str, raw: &JsonValue) -> Option<VariantBlock> {
    let (shape, entries) = match raw {
        JsonValue::Array(items) => {
            let mut entries = Vec::new();
            for item in items {
                match item {
                    JsonValue::Object(pairs) => entries.extend(variant_entries(pairs)),
                    _ => warn!(check_id, pattern, "ignoring variant item that is not a mapping"),
                }
            }
            (EntryShape::List, entries)
        }
        JsonValue::Object(pairs) => (EntryShape::FlatMapping, variant_entries(pairs).collect()),
        JsonValue::Null => (EntryShape::List, Vec::new()),
        _ => {
            warn!(check_id, pattern, "ignoring variant block that is neither a list nor a mapping");
            return None;
        }
    };
    Some(VariantBlock {
        pattern: pattern.to_string(),
        shape,
        entries,
    })
}

fn variant_entries(pairs: &JsonMap) -> impl Iterator<Item = VariantEntry> + '_ {
    pairs.iter().map(|(name, value)| VariantEntry {
        name: name.clone(),
        value: match value {
            JsonValue::Object(map) => TagValue::Structured(map.clone()),
            other => TagValue::Tag(scalar_text(other).unwrap_or_default()),
        },
    })
}

fn parse_ports(section: &str, value: &JsonValue) -> Result<Vec<PortRule>, RuleError> {
    let map = match value {
        JsonValue::Object(map) => map,
        JsonValue::Null => return Ok(Vec::new()),
        _ => {
            return Err(RuleError::InvalidSection {
                section: section.to_string(),
            });
        }
    };

    let mut out = Vec::new();
    for (check_id, body) in map {
        let Some(body) = body.as_object() else {
            warn!(check_id = %check_id, "skipping listening-port check that is not a mapping");
            continue;
        };
        let addresses: Vec<String> = match body.get("address") {
            Some(JsonValue::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(v) => scalar_text(v).into_iter().collect(),
            None => Vec::new(),
        };
        if addresses.is_empty() {
            warn!(check_id = %check_id, "skipping listening-port check without addresses");
            continue;
        }
        out.push(PortRule {
            check_id: check_id.clone(),
            addresses,
            description: body.get("description").and_then(scalar_text),
            labels: string_set(body.get("labels")),
            profile: None,
        });
    }
    Ok(out)
}

fn parse_controls(value: &JsonValue) -> Vec<ControlEntry> {
    let entry = |tag: &str, reason: &JsonValue| ControlEntry {
        tag: tag.to_string(),
        reason: match reason {
            JsonValue::Object(m) => m.get("reason").and_then(scalar_text).unwrap_or_default(),
            other => scalar_text(other).unwrap_or_default(),
        },
        profile: None,
    };

    let mut out = Vec::new();
    let push_map = |m: &JsonMap, out: &mut Vec<ControlEntry>| {
        out.extend(m.iter().map(|(tag, reason)| entry(tag, reason)));
    };
    match value {
        JsonValue::Array(items) => {
            for item in items {
                match item {
                    JsonValue::String(tag) => out.push(entry(tag, &JsonValue::Null)),
                    JsonValue::Object(m) => push_map(m, &mut out),
                    _ => warn!("ignoring malformed control entry"),
                }
            }
        }
        JsonValue::Object(m) => push_map(m, &mut out),
        JsonValue::String(tag) => out.push(entry(tag, &JsonValue::Null)),
        JsonValue::Null => {}
        _ => warn!("ignoring malformed control section"),
    }
    out
}

fn parse_generic(check_id: &str, value: &JsonValue) -> Result<GenericCheck, RuleError> {
    let invalid = |reason: &str| RuleError::InvalidDefinition {
        section: "audit".to_string(),
        check_id: check_id.to_string(),
        reason: reason.to_string(),
    };
    let Some((function, body)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Err(invalid("expected `<function>: {...}`"));
    };
    let Some(body) = body.as_object() else {
        return Err(invalid("function arguments must be a mapping"));
    };

    let mut check = GenericCheck {
        check_id: check_id.to_string(),
        function: function.clone(),
        args: Vec::new(),
        kwargs: JsonMap::new(),
        tag: check_id.to_string(),
        description: None,
        version: None,
        target: "*".to_string(),
        labels: BTreeSet::new(),
        control: None,
        extra: JsonMap::new(),
        profile: None,
    };
    for (key, v) in body {
        match key.as_str() {
            "args" => {
                check.args = match v {
                    JsonValue::Array(items) => items.clone(),
                    JsonValue::Null => Vec::new(),
                    other => vec![other.clone()],
                }
            }
            "kwargs" => check.kwargs = v.as_object().cloned().unwrap_or_default(),
            "tag" => {
                if let Some(tag) = scalar_text(v) {
                    check.tag = tag;
                }
            }
            "description" => check.description = scalar_text(v),
            "version" => check.version = scalar_text(v).filter(|s| !s.trim().is_empty()),
            "target" => {
                if let Some(target) = scalar_text(v) {
                    check.target = target;
                }
            }
            "labels" => check.labels = string_set(Some(v)),
            "control" => check.control = control_reason(v),
            _ => {
                check.extra.insert(key.clone(), v.clone());
            }
        }
    }
    Ok(check)
}
