//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Merge order preservation across profiles
//! - Variant selection precedence
//! - Label subset filtering
//! - Version range evaluation
//! - Report post-processing

use crate::engine::finalize;
use crate::labels::{filter_section, labels_satisfy};
use crate::merge::merge_documents;
use crate::model::{RuleDocument, RuleEntry};
use crate::options::ReportOptions;
use crate::report::AuditResults;
use crate::resolve::{ResolvedCheck, TagIndex, resolve_section, select_variant};
use crate::test_support::{doc_with_packages, entry};
use crate::version::{StrictVersion, version_matches};
use hostguard_types::{AuditOutcome, Bucket, ListKind, ids};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Strategies
// ============================================================================

fn arb_label() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["cis", "critical", "network", "pci", "stig"]).prop_map(String::from)
}

fn arb_label_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(arb_label(), 0..4)
}

fn arb_os() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["CentOS Linux-7", "Ubuntu-20.04", "Debian-10", "Windows-2016Server"])
        .prop_map(String::from)
}

fn arb_pattern() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["CentOS*", "Ubuntu*", "Debian*, Ubuntu-18*", "Windows*", "*"])
        .prop_map(String::from)
}

/// Entry with up to three variant blocks, each producing one tag.
fn arb_entry() -> impl Strategy<Value = RuleEntry> {
    (
        "[a-z]{3,8}",
        arb_label_set(),
        prop::collection::vec((arb_pattern(), "[A-Z]{2}-[0-9]{1,2}"), 0..3),
    )
        .prop_map(|(name, label_set, blocks)| {
            let pairs: Vec<(String, Vec<(String, String)>)> = blocks
                .into_iter()
                .map(|(pattern, tag)| (pattern, vec![(name.clone(), tag)]))
                .collect();
            let borrowed: Vec<(&str, Vec<(&str, &str)>)> = pairs
                .iter()
                .map(|(p, items)| {
                    (
                        p.as_str(),
                        items.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect(),
                    )
                })
                .collect();
            let variants: Vec<(&str, &[(&str, &str)])> =
                borrowed.iter().map(|(p, items)| (*p, items.as_slice())).collect();
            let label_refs: Vec<&str> = label_set.iter().map(String::as_str).collect();
            entry(&name, &label_refs, &variants)
        })
}

fn arb_document() -> impl Strategy<Value = RuleDocument> {
    (
        prop::collection::vec(arb_entry(), 0..4),
        prop::collection::vec(arb_entry(), 0..4),
    )
        .prop_map(|(black, white)| doc_with_packages(black, white))
}

fn arb_version() -> impl Strategy<Value = StrictVersion> {
    (0u64..5, 0u64..5, 0u64..5).prop_map(|(major, minor, patch)| StrictVersion {
        major,
        minor,
        patch,
    })
}

/// Instances per (tag, list kind), in resolution order.
fn by_tag_and_kind(parts: Vec<TagIndex>) -> BTreeMap<(String, ListKind), Vec<ResolvedCheck>> {
    let mut out: BTreeMap<(String, ListKind), Vec<ResolvedCheck>> = BTreeMap::new();
    for part in parts {
        for (tag, checks) in part {
            for check in checks {
                out.entry((tag.clone(), check.kind)).or_default().push(check);
            }
        }
    }
    out
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Merging then resolving equals resolving each document and concatenating
    /// in input order (per tag and list kind).
    #[test]
    fn merge_then_resolve_equals_concatenated_resolution(
        a in arb_document(),
        b in arb_document(),
        os in arb_os(),
    ) {
        let merged = merge_documents([("a", &a), ("b", &b)]);
        let merged_index = resolve_section(ids::MODULE_PACKAGE, &merged.package, &os);

        let separate = [("a", &a), ("b", &b)]
            .into_iter()
            .map(|(profile, doc)| {
                let tagged = merge_documents([(profile, doc)]);
                resolve_section(ids::MODULE_PACKAGE, &tagged.package, &os)
            })
            .collect();
        prop_assert_eq!(by_tag_and_kind(vec![merged_index]), by_tag_and_kind(separate));
    }

    /// Merging never mutates its inputs.
    #[test]
    fn merge_leaves_inputs_untouched(a in arb_document(), b in arb_document()) {
        let (a0, b0) = (a.clone(), b.clone());
        let merged = merge_documents([("a", &a), ("b", &b)]);
        prop_assert_eq!(&a, &a0);
        prop_assert_eq!(&b, &b0);
        prop_assert_eq!(
            merged.package.blacklist.len(),
            a.package.blacklist.len() + b.package.blacklist.len()
        );
    }

    /// A selected non-wildcard block always matches the host; the wildcard is
    /// only selected when no other block matches.
    #[test]
    fn variant_selection_prefers_specific_patterns(e in arb_entry(), os in arb_os()) {
        let variants = &e.definition.variants;
        let specific_match = variants
            .iter()
            .any(|b| b.pattern != "*" && crate::glob::any_glob_matches(&b.pattern, &os));
        match select_variant(variants, &os) {
            Some(block) if block.pattern == "*" => prop_assert!(!specific_match),
            Some(_) => prop_assert!(specific_match),
            None => {
                prop_assert!(!specific_match);
                prop_assert!(variants.iter().all(|b| b.pattern != "*"));
            }
        }
    }

    /// Every entry kept by the label filter carries all requested labels, and
    /// every dropped entry is missing at least one.
    #[test]
    fn label_filter_is_a_subset_test(doc in arb_document(), requested in arb_label_set()) {
        let filtered = filter_section(&doc.package, &requested);
        for (_, e) in filtered.iter() {
            prop_assert!(labels_satisfy(&e.definition.labels, &requested));
        }
        let kept = filtered.iter().count();
        let expected = doc
            .package
            .iter()
            .filter(|(_, e)| requested.is_subset(&e.definition.labels))
            .count();
        prop_assert_eq!(kept, expected);
    }

    /// A single range term agrees with direct comparison.
    #[test]
    fn single_terms_agree_with_ordering(bound in arb_version(), current in arb_version()) {
        let cur = current.to_string();
        prop_assert_eq!(version_matches(&format!("<={bound}"), &cur).unwrap(), current <= bound);
        prop_assert_eq!(version_matches(&format!("<{bound}"), &cur).unwrap(), current < bound);
        prop_assert_eq!(version_matches(&format!(">={bound}"), &cur).unwrap(), current >= bound);
        prop_assert_eq!(version_matches(&format!(">{bound}"), &cur).unwrap(), current > bound);
        prop_assert_eq!(version_matches(&bound.to_string(), &cur).unwrap(), current == bound);
    }

    /// `;` is OR over groups and `,` is AND within a group.
    #[test]
    fn groups_combine_as_or_of_ands(
        lo in arb_version(),
        hi in arb_version(),
        other in arb_version(),
        current in arb_version(),
    ) {
        let cur = current.to_string();
        let expr = format!(">={lo},<{hi};>={other}");
        let expected = (current >= lo && current < hi) || current >= other;
        prop_assert_eq!(version_matches(&expr, &cur).unwrap(), expected);
    }

    /// Terse reports only contain single-key maps and hidden successes never
    /// leak into the report.
    #[test]
    fn post_processing_respects_visibility(
        tags in prop::collection::vec(("[A-Z]{3}-[0-9]", 0usize..4), 0..12),
        verbose in any::<bool>(),
        show_success in any::<bool>(),
    ) {
        let mut results = AuditResults::default();
        for (tag, bucket) in &tags {
            let bucket = [Bucket::Success, Bucket::Failure, Bucket::Skipped, Bucket::Controlled][*bucket];
            results.push(bucket, AuditOutcome::new(tag.clone(), ids::MODULE_PACKAGE));
        }
        let failures = results.failure.len();
        let report = finalize(results, &ReportOptions { verbose, show_success, show_compliance: false });

        prop_assert_eq!(report.failure.len(), failures);
        if !show_success {
            prop_assert!(report.success.is_none());
            prop_assert!(report.skipped.is_none());
        }
        if let Some(skipped) = &report.skipped {
            prop_assert!(!skipped.is_empty());
        }
        let v = serde_json::to_value(&report).unwrap();
        if !verbose {
            for (key, entries) in v.as_object().unwrap() {
                for item in entries.as_array().unwrap() {
                    let obj = item.as_object().unwrap();
                    prop_assert_eq!(obj.len(), 1, "bucket {} entry {:?}", key, obj);
                }
            }
        }
    }
}
