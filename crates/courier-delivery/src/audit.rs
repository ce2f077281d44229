//! Audit trail for secret usage
//!
//! Every use of a decrypted credential leaves one line identifying the
//! action, the acting user, and a short hash of the secret. The secret
//! itself, in either form, never appears.

use tracing::info;

/// Formats one audit line. `hash` is the 8-hex-char digest prefix from
/// [`courier_core::CredentialVault::audit_hash`], never the secret.
pub fn audit_line(action: &str, user: Option<&str>, hash: &str) -> String {
    format!(
        "[AUDIT] {action} - User: {user}, Hash: {hash}",
        user = user.unwrap_or("unknown")
    )
}

/// Emits audit lines on a dedicated tracing target so embedders can route
/// them to durable storage.
#[derive(Debug, Clone, Default)]
pub struct AuditLog;

impl AuditLog {
    pub fn new() -> Self {
        Self
    }

    pub fn record(&self, action: &str, user: Option<&str>, hash: &str) {
        info!(target: "audit", "{}", audit_line(action, user, hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_line_format() {
        assert_eq!(
            audit_line("api key used for send", Some("user-1"), "a1b2c3d4"),
            "[AUDIT] api key used for send - User: user-1, Hash: a1b2c3d4"
        );
    }

    #[test]
    fn test_missing_user_reads_unknown() {
        let line = audit_line("api key validated", None, "a1b2c3d4");
        assert!(line.contains("User: unknown"));
    }
}
