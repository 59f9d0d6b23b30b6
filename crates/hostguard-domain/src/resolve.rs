//! OS-variant resolution: picks the variant block that applies to the host and
//! flattens it into check instances indexed by tag.

use crate::glob::any_glob_matches;
use crate::model::{
    EntryShape, JsonMap, ListSection, RuleEntry, TagValue, VariantBlock, control_reason,
    scalar_text,
};
use hostguard_types::ListKind;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

const WILDCARD: &str = "*";
const RESERVED_KEYS: [&str; 5] = ["name", "tag", "module", "kind", "type"];

/// One executable instance of a rule for the current host.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCheck {
    pub check_id: String,
    pub name: String,
    pub tag: String,
    pub module: String,
    pub kind: ListKind,
    pub description: Option<String>,
    pub labels: BTreeSet<String>,
    pub alert: Option<JsonValue>,
    pub trigger: Option<JsonValue>,
    /// Modifiers from the variant entry layered under the definition's own extras.
    pub extra: JsonMap,
    pub profile: Option<String>,
    pub control: Option<String>,
}

impl ResolvedCheck {
    pub fn modifier(&self, key: &str) -> Option<&JsonValue> {
        self.extra.get(key)
    }

    /// Boolean modifier, `default` when absent or not a boolean.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.extra.get(key) {
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" => true,
                "false" | "no" => false,
                _ => default,
            },
            _ => default,
        }
    }
}

/// Tag -> every instance reported under that tag, in resolution order.
pub type TagIndex = BTreeMap<String, Vec<ResolvedCheck>>;

/// Select the variant block for `os_identifier`.
///
/// Non-wildcard blocks are tried in stored order; the first one with a
/// matching glob wins. Otherwise the `*` block is used, if any.
pub fn select_variant<'a>(
    variants: &'a [VariantBlock],
    os_identifier: &str,
) -> Option<&'a VariantBlock> {
    variants
        .iter()
        .filter(|b| b.pattern != WILDCARD)
        .find(|b| any_glob_matches(&b.pattern, os_identifier))
        .or_else(|| variants.iter().find(|b| b.pattern == WILDCARD))
}

/// Resolve every entry of a list section.
pub fn resolve_section(module: &str, section: &ListSection, os_identifier: &str) -> TagIndex {
    let mut index = TagIndex::new();
    for (kind, entry) in section.iter() {
        resolve_entry(module, kind, entry, os_identifier, &mut index);
    }
    index
}

/// Resolve one rule entry and append its instances to `index`.
pub fn resolve_entry(
    module: &str,
    kind: ListKind,
    entry: &RuleEntry,
    os_identifier: &str,
    index: &mut TagIndex,
) {
    let Some(block) = select_variant(&entry.definition.variants, os_identifier) else {
        return;
    };
    if block.shape == EntryShape::FlatMapping {
        warn!(
            module,
            check_id = %entry.check_id,
            pattern = %block.pattern,
            "variant entries are written as a mapping; treating each pair as a list item"
        );
    }

    for variant in &block.entries {
        let (tag, variant_extra) = match &variant.value {
            TagValue::Tag(tag) => (tag.clone(), JsonMap::new()),
            TagValue::Structured(map) => {
                let mut map = map.clone();
                let Some(tag) = map.remove("tag").as_ref().and_then(scalar_text) else {
                    warn!(
                        module,
                        check_id = %entry.check_id,
                        name = %variant.name,
                        "variant entry has no tag; skipping"
                    );
                    continue;
                };
                (tag, map)
            }
        };
        let check = build_check(module, kind, entry, &variant.name, tag, variant_extra);
        index.entry(check.tag.clone()).or_default().push(check);
    }
}

fn build_check(
    module: &str,
    kind: ListKind,
    entry: &RuleEntry,
    name: &str,
    tag: String,
    variant_extra: JsonMap,
) -> ResolvedCheck {
    let def = &entry.definition;

    let mut extra = JsonMap::new();
    for (key, value) in variant_extra.into_iter().chain(def.extra.clone()) {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            extra.insert(key, value);
        }
    }
    let hoisted_description = extra.remove("description").as_ref().and_then(scalar_text);
    let hoisted_control = extra.remove("control").as_ref().and_then(control_reason);
    let hoisted_labels = extra.remove("labels");

    let mut labels = def.labels.clone();
    if labels.is_empty()
        && let Some(JsonValue::Array(items)) = hoisted_labels
    {
        labels = items.iter().filter_map(scalar_text).collect();
    }

    ResolvedCheck {
        check_id: entry.check_id.clone(),
        name: name.to_string(),
        tag,
        module: module.to_string(),
        kind,
        description: def.description.clone().or(hoisted_description),
        labels,
        alert: def.alert.clone(),
        trigger: def.trigger.clone(),
        extra,
        profile: entry.profile.clone(),
        control: def.control.clone().or(hoisted_control),
    }
}
