//! Config parsing and preset resolution.
//!
//! This crate is IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

mod model;
mod presets;
mod resolve;

pub use model::HostguardConfigV1;
pub use presets::PRESETS;
pub use resolve::{CONFIG_SCHEMA_V1, DEFAULT_TOPFILE, Overrides, ResolvedConfig};

/// Parse `hostguard.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<HostguardConfigV1> {
    let cfg: HostguardConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective run configuration (preset, then config file, then overrides).
pub fn resolve_config(
    cfg: HostguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
