use crate::model::{ListSection, RuleDocument};

/// Combine documents into one aggregate, in input order.
///
/// Every contributed entry is tagged with the profile it came from (entries
/// that already carry a profile keep it). Duplicate check-ids are kept: two
/// profiles may define the same id for different OS variants.
pub fn merge_documents<'a, I>(documents: I) -> RuleDocument
where
    I: IntoIterator<Item = (&'a str, &'a RuleDocument)>,
{
    let mut merged = RuleDocument::default();
    for (profile, doc) in documents {
        let tag = |existing: &Option<String>| existing.clone().or_else(|| Some(profile.to_string()));

        append_section(&mut merged.package, &doc.package, &tag);
        append_section(&mut merged.policy_setting, &doc.policy_setting, &tag);
        append_section(&mut merged.kernel_param, &doc.kernel_param, &tag);

        merged
            .listening_port
            .extend(doc.listening_port.iter().cloned().map(|mut rule| {
                rule.profile = tag(&rule.profile);
                rule
            }));
        merged
            .controls
            .extend(doc.controls.iter().cloned().map(|mut control| {
                control.profile = tag(&control.profile);
                control
            }));
        merged.generic.extend(doc.generic.iter().cloned().map(|mut check| {
            check.profile = tag(&check.profile);
            check
        }));

        if merged.vulnerability.is_none()
            && let Some(vuln) = &doc.vulnerability
        {
            let mut vuln = vuln.clone();
            vuln.profile = tag(&vuln.profile);
            merged.vulnerability = Some(vuln);
        }
    }
    merged
}

fn append_section(
    into: &mut ListSection,
    from: &ListSection,
    tag: &dyn Fn(&Option<String>) -> Option<String>,
) {
    for (kind, entry) in from.iter() {
        let mut entry = entry.clone();
        entry.profile = tag(&entry.profile);
        into.entries_mut(kind).push(entry);
    }
}
