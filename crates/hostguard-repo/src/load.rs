use crate::parse::parse_rule_yaml;
use crate::store::RuleSource;
use anyhow::Context;
use hostguard_domain::model::RuleDocument;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Read and parse every source in parallel, keeping input order.
///
/// Files that cannot be read or parsed are logged and left out; the returned
/// pairs are `(profile, document)`.
pub fn load_documents(sources: &[RuleSource]) -> Vec<(String, RuleDocument)> {
    let loaded: Vec<anyhow::Result<RuleDocument>> = sources
        .par_iter()
        .map(|source| {
            let text = std::fs::read_to_string(&source.path)
                .with_context(|| format!("read {}", source.path))?;
            parse_rule_yaml(&text).with_context(|| format!("parse {}", source.path))
        })
        .collect();

    let mut out = Vec::with_capacity(sources.len());
    for (source, result) in sources.iter().zip(loaded) {
        match result {
            Ok(doc) => {
                debug!(profile = %source.profile, path = %source.path, "loaded rule document");
                out.push((source.profile.as_str().to_string(), doc));
            }
            Err(err) => warn!(
                profile = %source.profile,
                error = %format!("{err:#}"),
                "skipping rule document that failed to load"
            ),
        }
    }
    out
}
