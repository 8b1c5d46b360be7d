//! Password hashing and session tokens
//!
//! Passwords are stored as bcrypt hashes; the salt and cost are part of the
//! stored string. Session tokens are random bytes, hex encoded.
//!
//! # Pure Functions
//!
//! Nothing here touches the database or an HTTP framework; the user and
//! session repositories in [`crate::db::users`] call into this module.

use rand::RngCore;
use tracing::warn;

/// bcrypt work factor for new hashes
pub const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

const TOKEN_BYTES: usize = 32;

/// Generate an opaque session token, hex encoded (64 chars)
pub fn generate_session_token() -> String {
    let mut token = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut token);
    to_hex(&token)
}

/// Hash a password with a fresh random salt
///
/// ```
/// use bookz_common::auth::{hash_password, verify_password};
///
/// let hash = hash_password("hunter22").unwrap();
/// assert!(hash.starts_with("$2b$"));
/// assert!(verify_password("hunter22", &hash));
/// ```
pub fn hash_password(password: &str) -> crate::Result<String> {
    bcrypt::hash(password, PASSWORD_COST)
        .map_err(|e| crate::Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored bcrypt hash
///
/// A stored value that is not a bcrypt hash never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(password, stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

/// Validate username/password shape before creating an account
pub fn validate_credentials(username: &str, password: &str) -> crate::Result<()> {
    let username = username.trim();
    if username.is_empty() || username.len() > 64 {
        return Err(crate::Error::InvalidInput(
            "Username must be between 1 and 64 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(crate::Error::InvalidInput(
            "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    if password.chars().count() < 8 {
        return Err(crate::Error::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct horse").unwrap();

        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("correct horse!", &hash));
        // Salted: the same password never hashes twice to the same string
        assert_ne!(hash, hash_password("correct horse").unwrap());
    }

    #[test]
    fn test_verify_rejects_foreign_hash() {
        assert!(!verify_password("correct horse", ""));
        assert!(!verify_password("correct horse", "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"));
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials("reader", "longenough").is_ok());
        assert!(validate_credentials("", "longenough").is_err());
        assert!(validate_credentials("bad name", "longenough").is_err());
        assert!(validate_credentials("reader", "short").is_err());
    }
}
