use super::{CheckProvider, utils};
use crate::glob::glob_matches;
use crate::host::{AuditContext, LiveSocket};
use crate::labels::filter_ports;
use crate::model::{PortRule, RuleDocument};
use crate::options::AuditRequest;
use crate::report::AuditResults;
use hostguard_types::{AuditOutcome, Bucket, ListKind, ids};
use serde_json::Value;
use tracing::debug;

/// Whitelist of addresses allowed to listen.
///
/// Iterates the observed sockets rather than the rules: a socket matching a
/// configured address glob is a Success tagged with that glob; any other
/// socket is a Failure tagged with its own address. Tag globs do not apply.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListeningPortCheck;

impl CheckProvider for ListeningPortCheck {
    fn module(&self) -> &'static str {
        ids::MODULE_LISTENING_PORT
    }

    fn evaluate(
        &self,
        rules: &RuleDocument,
        request: &AuditRequest,
        ctx: &AuditContext<'_>,
        out: &mut AuditResults,
    ) {
        let rules = filter_ports(&rules.listening_port, &request.labels);
        let allowed: Vec<(&str, &PortRule)> = rules
            .iter()
            .flat_map(|rule| rule.addresses.iter().map(move |a| (a.as_str(), rule)))
            .collect();
        if allowed.is_empty() {
            return;
        }
        if request.debug {
            debug!(module = ids::MODULE_LISTENING_PORT, rules = ?rules, "whitelisted addresses");
        }

        let sockets = match ctx.probes.live_sockets() {
            Ok(sockets) => sockets,
            Err(err) => {
                let mut outcome =
                    AuditOutcome::new(ids::MODULE_LISTENING_PORT, ids::MODULE_LISTENING_PORT);
                utils::mark_failed(&mut outcome, ids::CODE_PROBE_ERROR, err.to_string());
                utils::push(out, Bucket::Failure, outcome);
                return;
            }
        };

        for socket in sockets {
            let matched = allowed
                .iter()
                .find(|(glob, _)| glob_matches(glob, &socket.local_address));
            match matched {
                Some((glob, rule)) => {
                    let mut outcome = socket_outcome(glob, &socket);
                    outcome.check_id = Some(rule.check_id.clone());
                    outcome.description =
                        Some(rule.description.clone().unwrap_or_else(|| rule.check_id.clone()));
                    outcome.labels = rule.labels.iter().cloned().collect();
                    outcome.profile = rule.profile.clone();
                    utils::push(out, Bucket::Success, outcome);
                }
                None => {
                    let mut outcome = socket_outcome(&socket.local_address, &socket);
                    outcome.description = socket.program.clone();
                    let reason = format!(
                        "Address '{}' ({}) is listening but is not whitelisted",
                        socket.local_address,
                        socket.program.as_deref().unwrap_or("unknown program"),
                    );
                    utils::mark_failed(&mut outcome, ids::CODE_UNLISTED_ADDRESS, reason);
                    utils::push(out, Bucket::Failure, outcome);
                }
            }
        }
    }
}

fn socket_outcome(tag: &str, socket: &LiveSocket) -> AuditOutcome {
    let mut outcome = AuditOutcome::new(tag, ids::MODULE_LISTENING_PORT);
    outcome.name = socket.program.clone();
    outcome.kind = Some(ListKind::Whitelist);
    outcome.data = serde_json::to_value(socket).unwrap_or(Value::Null);
    outcome
}
