use crate::model::{ListSection, PortRule};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// A check qualifies when it carries every requested label.
pub fn labels_satisfy(own: &BTreeSet<String>, requested: &BTreeSet<String>) -> bool {
    requested.is_subset(own)
}

/// Keep only the entries whose labels include all of `requested`.
///
/// An empty request returns the section untouched.
pub fn filter_section<'a>(
    section: &'a ListSection,
    requested: &BTreeSet<String>,
) -> Cow<'a, ListSection> {
    if requested.is_empty() {
        return Cow::Borrowed(section);
    }
    let keep = |entries: &[crate::model::RuleEntry]| {
        entries
            .iter()
            .filter(|e| labels_satisfy(&e.definition.labels, requested))
            .cloned()
            .collect()
    };
    Cow::Owned(ListSection {
        blacklist: keep(&section.blacklist),
        whitelist: keep(&section.whitelist),
    })
}

pub fn filter_ports<'a>(rules: &'a [PortRule], requested: &BTreeSet<String>) -> Cow<'a, [PortRule]> {
    if requested.is_empty() {
        return Cow::Borrowed(rules);
    }
    Cow::Owned(
        rules
            .iter()
            .filter(|r| labels_satisfy(&r.labels, requested))
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entry, labels, section};

    #[test]
    fn subset_not_overlap() {
        let own = labels(&["critical", "cis"]);
        assert!(labels_satisfy(&own, &labels(&["critical"])));
        assert!(labels_satisfy(&own, &labels(&[])));
        assert!(!labels_satisfy(&own, &labels(&["critical", "extra"])));
        assert!(!labels_satisfy(&labels(&[]), &labels(&["critical"])));
    }

    #[test]
    fn filter_leaves_input_untouched() {
        let input = section(
            vec![entry("telnet", &["critical", "cis"], &[("*", &[("telnet", "T1")])])],
            vec![entry("unlabelled", &[], &[("*", &[("rsyslog", "T2")])])],
        );
        let before = input.clone();

        let filtered = filter_section(&input, &labels(&["critical"]));
        assert_eq!(filtered.blacklist.len(), 1);
        assert!(filtered.whitelist.is_empty());
        assert_eq!(input, before);

        assert!(matches!(filter_section(&input, &labels(&[])), Cow::Borrowed(_)));
    }
}
