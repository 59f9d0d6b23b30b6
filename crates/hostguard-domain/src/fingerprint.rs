use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 fingerprint for an audit outcome.
///
/// Identity fields:
/// - module
/// - tag
/// - check id (if present)
/// - item name (if present)
/// - profile (if present)
pub fn fingerprint_for_outcome(
    module: &str,
    tag: &str,
    check_id: Option<&str>,
    name: Option<&str>,
    profile: Option<&str>,
) -> String {
    let parts = [
        module,
        tag,
        check_id.unwrap_or(""),
        name.unwrap_or(""),
        profile.unwrap_or(""),
    ];
    let canonical = parts.join("|");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_and_sensitive_to_identity_fields() {
        let a = fingerprint_for_outcome("package", "CIS-1", Some("telnet"), Some("telnet"), None);
        let b = fingerprint_for_outcome("package", "CIS-1", Some("telnet"), Some("telnet"), None);
        let c = fingerprint_for_outcome("package", "CIS-1", Some("telnet"), Some("telnet"), Some("p"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
