//! Generic checks: `<check-id>: { <function>: {...} }` entries run through the
//! host's [`FunctionRunner`](crate::host::FunctionRunner).

use super::utils;
use crate::glob::glob_matches;
use crate::host::AuditContext;
use crate::labels::labels_satisfy;
use crate::model::GenericCheck;
use crate::options::AuditRequest;
use crate::report::AuditResults;
use crate::version::version_matches;
use hostguard_types::{AuditOutcome, Bucket, ids};
use serde_json::{Value, json};
use tracing::{debug, error};

/// Evaluate generic checks in document order.
///
/// Tag, label and target mismatches exclude a check silently. A version
/// constraint that the host cannot satisfy, or cannot evaluate, records the
/// check as Skipped with the reason.
pub fn run(
    checks: &[GenericCheck],
    request: &AuditRequest,
    ctx: &AuditContext<'_>,
    out: &mut AuditResults,
) {
    for check in checks {
        if !glob_matches(&request.tags, &check.tag) {
            debug!(check_id = %check.check_id, tag = %check.tag, tags = %request.tags, "tag does not match");
            continue;
        }
        if !labels_satisfy(&check.labels, &request.labels) {
            debug!(check_id = %check.check_id, labels = ?check.labels, "labels do not match");
            continue;
        }
        if !ctx.targets.matches(&check.target) {
            debug!(check_id = %check.check_id, target = %check.target, "target does not match host");
            continue;
        }

        let mut outcome = outcome_for(check);
        if let Some(reason) = &check.control {
            outcome.control = Some(reason.clone());
            utils::push(out, Bucket::Controlled, outcome);
            continue;
        }

        if let Some(constraint) = &check.version {
            if let Some((code, reason)) = version_gate(constraint, ctx.facts.agent_version.as_deref()) {
                debug!(check_id = %check.check_id, %reason, "skipping check");
                outcome.insert_data("code", json!(code));
                outcome.insert_data("reason", json!(reason));
                utils::push(out, Bucket::Skipped, outcome);
                continue;
            }
        }

        match ctx.functions.run(&check.function, &check.args, &check.kwargs) {
            Ok(result) => {
                let mut data = result.data;
                if let Value::Object(own) = std::mem::take(&mut outcome.data) {
                    data.extend(own);
                }
                outcome.data = Value::Object(data);
                if result.success {
                    utils::push(out, Bucket::Success, outcome);
                } else {
                    let reason = outcome
                        .data
                        .get("reason")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("'{}' reported a failure", check.function));
                    utils::mark_failed(&mut outcome, ids::CODE_CHECK_FAILED, reason);
                    utils::push(out, Bucket::Failure, outcome);
                }
            }
            Err(err) => {
                error!(check_id = %check.check_id, profile = ?check.profile, error = %err, "check raised an error");
                outcome.insert_data("reason", json!("exception"));
                outcome.insert_data("exception", json!(err.to_string()));
                utils::mark_failed(&mut outcome, ids::CODE_PROBE_ERROR, err.to_string());
                utils::push(out, Bucket::Failure, outcome);
            }
        }
    }
}

/// `Some((code, reason))` when the check must be skipped.
fn version_gate(constraint: &str, agent_version: Option<&str>) -> Option<(&'static str, String)> {
    let Some(current) = agent_version else {
        return Some((
            ids::CODE_VERSION_FACT_MISSING,
            format!("check requires agent version '{constraint}' but the host reports no agent version"),
        ));
    };
    match version_matches(constraint, current) {
        Ok(true) => None,
        Ok(false) => Some((
            ids::CODE_VERSION_OUT_OF_RANGE,
            format!("agent version '{current}' does not satisfy '{constraint}'"),
        )),
        Err(err) => Some((ids::CODE_VERSION_UNPARSEABLE, err.to_string())),
    }
}

fn outcome_for(check: &GenericCheck) -> AuditOutcome {
    let mut outcome = AuditOutcome::new(check.tag.clone(), check.function.clone());
    outcome.check_id = Some(check.check_id.clone());
    outcome.description = check.description.clone();
    outcome.labels = check.labels.iter().cloned().collect();
    outcome.profile = check.profile.clone();

    let mut data = check.extra.clone();
    if !check.args.is_empty() {
        data.insert("args".into(), Value::Array(check.args.clone()));
    }
    if !check.kwargs.is_empty() {
        data.insert("kwargs".into(), Value::Object(check.kwargs.clone()));
    }
    if let Some(version) = &check.version {
        data.insert("version".into(), json!(version));
    }
    if check.target != "*" {
        data.insert("target".into(), json!(check.target));
    }
    outcome.data = Value::Object(data);
    outcome
}
