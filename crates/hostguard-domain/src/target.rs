//! Compound host targeting over [`HostFacts`].
//!
//! Supported terms:
//! - `*` matches every host;
//! - a bare glob is matched against the host id;
//! - `G@key:glob` matches when any value of fact `key` matches `glob`;
//! - `L@a,b,c` matches when the host id is in the list.
//!
//! Terms combine with `not`, `and`, `or` (in decreasing precedence). Parentheses
//! are not supported.

use crate::glob::glob_matches;
use crate::host::{HostFacts, TargetMatcher};
use tracing::warn;

#[derive(Clone, Copy, Debug)]
pub struct FactTargetMatcher<'a> {
    facts: &'a HostFacts,
}

impl<'a> FactTargetMatcher<'a> {
    pub fn new(facts: &'a HostFacts) -> Self {
        Self { facts }
    }

    fn term(&self, term: &str) -> bool {
        if term == "*" {
            return true;
        }
        if let Some(rest) = term.strip_prefix("G@") {
            let Some((key, pattern)) = rest.split_once(':') else {
                warn!(term, "fact target without ':' never matches");
                return false;
            };
            return self
                .facts
                .fact_values(key)
                .iter()
                .any(|v| glob_matches(pattern, v));
        }
        if let Some(rest) = term.strip_prefix("L@") {
            return rest.split(',').any(|id| id.trim() == self.facts.host_id);
        }
        if term.len() > 2 && term.as_bytes()[1] == b'@' {
            warn!(term, "unsupported target matcher never matches");
            return false;
        }
        glob_matches(term, &self.facts.host_id)
    }
}

impl TargetMatcher for FactTargetMatcher<'_> {
    fn matches(&self, expression: &str) -> bool {
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        if tokens.is_empty() {
            return false;
        }
        tokens
            .split(|t| t.eq_ignore_ascii_case("or"))
            .any(|group| self.all_of(group))
    }
}

impl FactTargetMatcher<'_> {
    fn all_of(&self, group: &[&str]) -> bool {
        if group.is_empty() {
            return false;
        }
        let mut negate = false;
        let mut saw_term = false;
        for token in group {
            if token.eq_ignore_ascii_case("and") {
                continue;
            }
            if token.eq_ignore_ascii_case("not") {
                negate = !negate;
                continue;
            }
            saw_term = true;
            if self.term(token) == negate {
                return false;
            }
            negate = false;
        }
        saw_term
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn facts() -> HostFacts {
        let mut facts = HostFacts {
            host_id: "web01.prod".to_string(),
            os_identifier: "CentOS Linux-7".to_string(),
            os_name: Some("CentOS".to_string()),
            os_family: Some("RedHat".to_string()),
            ..HostFacts::default()
        };
        facts.extra.insert("roles".to_string(), json!(["web", "edge"]));
        facts
    }

    #[test]
    fn simple_terms() {
        let facts = facts();
        let m = FactTargetMatcher::new(&facts);
        assert!(m.matches("*"));
        assert!(m.matches("web*"));
        assert!(!m.matches("db*"));
        assert!(m.matches("G@os:CentOS"));
        assert!(m.matches("G@osfinger:CentOS*"));
        assert!(m.matches("G@roles:edge"));
        assert!(!m.matches("G@os:CoreOS"));
        assert!(m.matches("L@db01,web01.prod"));
        assert!(!m.matches("E@web.*"));
        assert!(!m.matches(""));
    }

    #[test]
    fn boolean_combinations() {
        let facts = facts();
        let m = FactTargetMatcher::new(&facts);
        assert!(m.matches("G@os_family:RedHat and web*"));
        assert!(!m.matches("G@os_family:RedHat and not web*"));
        assert!(m.matches("G@os:CoreOS or G@roles:web"));
        assert!(m.matches("not G@os:CoreOS"));
        assert!(!m.matches("G@os:CoreOS and web* or db*"));
        assert!(!m.matches("and"));
    }
}
