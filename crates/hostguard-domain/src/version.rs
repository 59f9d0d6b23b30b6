//! Version parsing and comparison.
//!
//! Two orderings are used by the engine:
//! - [`StrictVersion`] for the agent version gate on generic checks
//!   (`N.N` or `N.N.N`, anything else is rejected);
//! - [`LooseVersion`] for installed package versions, which come in whatever
//!   shape the package manager reports (`1:2.3-4ubuntu1`, `7.4p1`, ...).

use crate::error::VersionError;
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrictVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl StrictVersion {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let err = || VersionError {
            version: input.to_string(),
        };
        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(err());
        }
        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            *slot = part.parse().map_err(|_| err())?;
        }
        Ok(Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
        })
    }
}

impl fmt::Display for StrictVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Evaluate a constraint expression against `current`.
///
/// Grammar: groups separated by `;` are OR-ed, comparisons separated by `,`
/// inside a group are AND-ed. Each comparison is an optional operator
/// (`<=`, `<`, `>=`, `>`, or none for equality) followed by a strict version.
/// A comparison that is empty or does not parse is false.
///
/// `current` must itself be a strict version; otherwise the caller gets an error.
pub fn version_matches(constraint: &str, current: &str) -> Result<bool, VersionError> {
    let current = StrictVersion::parse(current.trim())?;
    Ok(constraint
        .split(';')
        .any(|group| group.split(',').all(|term| term_holds(term, current))))
}

fn term_holds(term: &str, current: StrictVersion) -> bool {
    let term = term.trim();
    let (op, rest) = split_operator(term);
    let Ok(wanted) = StrictVersion::parse(rest.trim()) else {
        return false;
    };
    match op {
        "<=" => current <= wanted,
        "<" => current < wanted,
        ">=" => current >= wanted,
        ">" => current > wanted,
        _ => current == wanted,
    }
}

fn split_operator(term: &str) -> (&str, &str) {
    for op in ["<=", ">=", "<", ">"] {
        if let Some(rest) = term.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", term)
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Component {
    Num(u64),
    Str(String),
}

/// Lenient version ordering: digit runs compare numerically, everything else
/// compares as text, and numbers sort before text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LooseVersion {
    raw: String,
    components: Vec<Component>,
}

impl LooseVersion {
    pub fn parse(input: &str) -> Self {
        let mut components = Vec::new();
        let mut chars = input.trim().chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                let mut run = String::new();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    run.push(d);
                    chars.next();
                }
                match run.parse::<u64>() {
                    Ok(n) => components.push(Component::Num(n)),
                    Err(_) => components.push(Component::Str(run)),
                }
            } else if c.is_ascii_alphabetic() {
                let mut run = String::new();
                while let Some(&a) = chars.peek().filter(|a| a.is_ascii_alphabetic()) {
                    run.push(a);
                    chars.next();
                }
                components.push(Component::Str(run));
            } else {
                chars.next();
                if c != '.' {
                    components.push(Component::Str(c.to_string()));
                }
            }
        }
        Self {
            raw: input.trim().to_string(),
            components,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

/// Package version requirement written in a whitelist entry.
///
/// `<` and `>` are inclusive: `<4.3.2` accepts `4.3.2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionModifier {
    AtMost(LooseVersion),
    AtLeast(LooseVersion),
    Exactly(LooseVersion),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidModifier {
    pub raw: String,
}

impl VersionModifier {
    pub fn parse(raw: &str) -> Result<Self, InvalidModifier> {
        let trimmed = raw.trim();
        let invalid = || InvalidModifier {
            raw: raw.to_string(),
        };
        let (ctor, rest): (fn(LooseVersion) -> Self, &str) =
            if let Some(rest) = trimmed.strip_prefix("<=").or_else(|| trimmed.strip_prefix('<')) {
                (VersionModifier::AtMost, rest)
            } else if let Some(rest) = trimmed
                .strip_prefix(">=")
                .or_else(|| trimmed.strip_prefix('>'))
            {
                (VersionModifier::AtLeast, rest)
            } else if let Some(rest) = trimmed
                .strip_prefix("==")
                .or_else(|| trimmed.strip_prefix('='))
            {
                (VersionModifier::Exactly, rest)
            } else {
                (VersionModifier::Exactly, trimmed)
            };
        let rest = rest.trim();
        if !rest.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(invalid());
        }
        Ok(ctor(LooseVersion::parse(rest)))
    }

    pub fn accepts(&self, installed: &LooseVersion) -> bool {
        match self {
            VersionModifier::AtMost(v) => installed <= v,
            VersionModifier::AtLeast(v) => installed >= v,
            VersionModifier::Exactly(v) => installed == v,
        }
    }
}

impl fmt::Display for VersionModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionModifier::AtMost(v) => write!(f, "<={}", v.as_str()),
            VersionModifier::AtLeast(v) => write!(f, ">={}", v.as_str()),
            VersionModifier::Exactly(v) => write!(f, "=={}", v.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_of_and_groups() {
        let c = ">=3.0.0,<3.1.0;>=3.2.0";
        assert!(version_matches(c, "3.0.5").unwrap());
        assert!(version_matches(c, "3.2.1").unwrap());
        assert!(!version_matches(c, "3.1.0").unwrap());
        assert!(!version_matches(c, "2.9").unwrap());
    }

    #[test]
    fn bare_term_means_equality_and_two_part_versions_pad() {
        assert!(version_matches("2.1", "2.1.0").unwrap());
        assert!(version_matches("2.1.0", "2.1").unwrap());
        assert!(!version_matches("2.1.1", "2.1").unwrap());
    }

    #[test]
    fn malformed_or_empty_terms_fail_their_group_only() {
        assert!(!version_matches("", "1.0.0").unwrap());
        assert!(!version_matches(">=1.0,", "1.5").unwrap());
        assert!(!version_matches(">=abc", "1.5").unwrap());
        assert!(version_matches(">=abc;>=1.0", "1.5").unwrap());
    }

    #[test]
    fn non_strict_host_version_is_an_error() {
        let err = version_matches(">=1.0", "1.0-beta").unwrap_err();
        assert_eq!(err.version, "1.0-beta");
        assert!(StrictVersion::parse("1").is_err());
        assert!(StrictVersion::parse("1.2.3.4").is_err());
        assert!(StrictVersion::parse("1..2").is_err());
    }

    #[test]
    fn loose_versions_order_numerically() {
        let v = LooseVersion::parse;
        assert!(v("4.3.2") < v("4.4.0"));
        assert!(v("4.10") > v("4.9"));
        assert!(v("1.0") < v("1.0.1"));
        assert!(v("7.4p1") > v("7.4"));
        assert!(v("1:2.3-4ubuntu1") < v("1:2.3-4ubuntu2"));
        assert_eq!(v("2.0"), v(" 2.0 "));
    }

    #[test]
    fn modifiers_map_angle_brackets_to_inclusive_comparisons() {
        let at_most = VersionModifier::parse("<4.3.2").unwrap();
        assert!(at_most.accepts(&LooseVersion::parse("4.3.2")));
        assert!(at_most.accepts(&LooseVersion::parse("4.1")));
        assert!(!at_most.accepts(&LooseVersion::parse("4.4.0")));

        let at_least = VersionModifier::parse(">2.0").unwrap();
        assert!(at_least.accepts(&LooseVersion::parse("2.0")));
        assert!(!at_least.accepts(&LooseVersion::parse("1.9")));

        let exact = VersionModifier::parse("1.2.3").unwrap();
        assert!(exact.accepts(&LooseVersion::parse("1.2.3")));
        assert!(!exact.accepts(&LooseVersion::parse("1.2.4")));
        assert_eq!(VersionModifier::parse("==1.2.3").unwrap(), exact);
    }

    #[test]
    fn unknown_modifier_prefix_is_rejected() {
        for raw in ["~1.2", "!1.0", "", "<", "latest"] {
            assert!(VersionModifier::parse(raw).is_err(), "{raw:?} should be invalid");
        }
    }
}
