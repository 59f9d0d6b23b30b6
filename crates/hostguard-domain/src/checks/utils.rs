use crate::fingerprint::fingerprint_for_outcome;
use crate::report::AuditResults;
use crate::resolve::ResolvedCheck;
use hostguard_types::{AuditOutcome, Bucket};
use serde_json::{Value, json};

/// Outcome carrying the check's identity and modifiers.
pub fn outcome_for(check: &ResolvedCheck) -> AuditOutcome {
    let mut outcome = AuditOutcome::new(check.tag.clone(), check.module.clone());
    outcome.check_id = Some(check.check_id.clone());
    outcome.name = Some(check.name.clone());
    outcome.kind = Some(check.kind);
    outcome.description = check.description.clone();
    outcome.labels = check.labels.iter().cloned().collect();
    outcome.profile = check.profile.clone();

    let mut data = check.extra.clone();
    if let Some(alert) = &check.alert {
        data.insert("alert".into(), alert.clone());
    }
    if let Some(trigger) = &check.trigger {
        data.insert("trigger".into(), trigger.clone());
    }
    if !data.is_empty() {
        outcome.data = Value::Object(data);
    }
    outcome
}

pub fn mark_failed(outcome: &mut AuditOutcome, code: &str, reason: String) {
    outcome.insert_data("code", json!(code));
    outcome.failure_reason = Some(reason);
}

/// Fingerprint and file an outcome.
pub fn push(out: &mut AuditResults, bucket: Bucket, mut outcome: AuditOutcome) {
    outcome.fingerprint = Some(fingerprint_for_outcome(
        &outcome.module,
        &outcome.tag,
        outcome.check_id.as_deref(),
        outcome.name.as_deref(),
        outcome.profile.as_deref(),
    ));
    out.push(bucket, outcome);
}
