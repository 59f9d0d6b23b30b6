use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use hostguard_types::RuleRef;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Resolves rule references to local files.
pub trait RuleStore: Sync {
    /// Local path for `rule`: a `.yaml` file or a directory of them.
    /// `Ok(None)` means the reference does not exist.
    fn fetch(&self, rule: &RuleRef) -> anyhow::Result<Option<Utf8PathBuf>>;
}

/// Rule store backed by a directory tree: `cis.linux` is `<root>/cis/linux.yaml`,
/// or the directory `<root>/cis/linux`.
#[derive(Clone, Debug)]
pub struct DirRuleStore {
    root: Utf8PathBuf,
}

impl DirRuleStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl RuleStore for DirRuleStore {
    fn fetch(&self, rule: &RuleRef) -> anyhow::Result<Option<Utf8PathBuf>> {
        let file = self.root.join(rule.to_relative_file());
        if file.is_file() {
            return Ok(Some(file));
        }
        let dir = self.root.join(rule.to_relative_dir());
        if dir.is_dir() {
            return Ok(Some(dir));
        }
        if !self.root.is_dir() {
            anyhow::bail!("rules root {} is not a directory", self.root);
        }
        Ok(None)
    }
}

/// A rule file ready to load, with the profile name its outcomes will carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSource {
    pub profile: RuleRef,
    pub path: Utf8PathBuf,
}

/// Fetch every reference, expanding directories to the `.yaml` files below
/// them in sorted order. Unknown or unreadable references are logged and skipped.
pub fn expand_references(store: &dyn RuleStore, refs: &[RuleRef]) -> Vec<RuleSource> {
    let mut out = Vec::new();
    for rule in refs {
        let path = match store.fetch(rule) {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(rule = %rule, "rule reference not found; skipping");
                continue;
            }
            Err(err) => {
                warn!(rule = %rule, error = %format!("{err:#}"), "could not fetch rule reference; skipping");
                continue;
            }
        };

        if path.is_dir() {
            match yaml_files_below(&path) {
                Ok(files) => {
                    debug!(rule = %rule, files = files.len(), "expanded rule directory");
                    out.extend(files.into_iter().map(|(rel, path)| RuleSource {
                        profile: RuleRef::new(format!("{rule}/{rel}")),
                        path,
                    }));
                }
                Err(err) => {
                    warn!(rule = %rule, error = %format!("{err:#}"), "could not list rule directory; skipping")
                }
            }
        } else {
            out.push(RuleSource {
                profile: rule.clone(),
                path,
            });
        }
    }
    out
}

/// `(relative path, absolute path)` of every `.yaml` file below `dir`, sorted.
fn yaml_files_below(dir: &Utf8Path) -> anyhow::Result<Vec<(String, Utf8PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("walk {dir}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(abs) = pathbuf_to_utf8(entry.path().to_path_buf()) else {
            warn!(path = %entry.path().display(), "skipping non UTF-8 rule path");
            continue;
        };
        if abs.extension() != Some("yaml") {
            continue;
        }
        let rel = abs
            .strip_prefix(dir)
            .unwrap_or(&abs)
            .as_str()
            .replace('\\', "/");
        files.push((rel, abs));
    }
    files.sort();
    Ok(files)
}

fn pathbuf_to_utf8(path: PathBuf) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).ok()
}
