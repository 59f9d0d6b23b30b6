use crate::model::ControlEntry;
use crate::report::AuditResults;
use std::collections::BTreeMap;
use tracing::debug;

/// Move failures whose tag has a compensating control into Controlled.
///
/// When a tag is controlled more than once, the last declaration supplies the
/// reason.
pub fn apply(controls: &[ControlEntry], results: &mut AuditResults) {
    if controls.is_empty() {
        return;
    }
    let mut reasons: BTreeMap<&str, &str> = BTreeMap::new();
    for control in controls {
        reasons.insert(control.tag.as_str(), control.reason.as_str());
    }

    let failures = std::mem::take(&mut results.failure);
    for mut outcome in failures {
        match reasons.get(outcome.tag.as_str()) {
            Some(reason) => {
                debug!(tag = %outcome.tag, reason, "failure covered by compensating control");
                outcome.control = Some(reason.to_string());
                results.controlled.push(outcome);
            }
            None => results.failure.push(outcome),
        }
    }
}
