//! Repository adapters: locate rule files, parse rule documents and topfiles,
//! and load recorded host state.
//!
//! This crate is allowed to do filesystem IO. It never runs host probes itself;
//! live state reaches the engine through a [`HostSnapshot`] or a caller-provided
//! implementation of the domain host traits.

#![forbid(unsafe_code)]

mod load;
mod parse;
mod snapshot;
mod store;
mod topfile;

pub use load::load_documents;
pub use parse::{parse_rule_yaml, yaml_to_json};
pub use snapshot::{HostSnapshot, RecordedFunction, load_host_snapshot};
pub use store::{DirRuleStore, RuleSource, RuleStore, expand_references};
pub use topfile::{TopEntry, TopTarget, Topfile, TopfileError, load_topfile, parse_topfile};

/// Parser entry points that never touch the filesystem.
/// These functions are designed to never panic on any input.
pub mod fuzz {
    /// Parse arbitrary text as a rule document.
    pub fn parse_rule_document(text: &str) -> anyhow::Result<()> {
        let _ = crate::parse::parse_rule_yaml(text)?;
        Ok(())
    }

    /// Parse arbitrary text as a topfile.
    pub fn parse_topfile(text: &str) -> anyhow::Result<()> {
        let _ = crate::topfile::parse_topfile(text)?;
        Ok(())
    }
}
