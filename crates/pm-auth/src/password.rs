//! Password rules, hashing, and one-time tokens

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use pm_core::config::AuthConfig;

use crate::directory::{DirectoryError, DirectoryResult};

const TOKEN_LENGTH: usize = 40;

/// Password strength rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for PasswordPolicy {
    fn from(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
            require_digit: config.password_require_digit,
            require_lowercase: config.password_require_lowercase,
            require_uppercase: config.password_require_uppercase,
            require_non_alphanumeric: config.password_require_non_alphanumeric,
        }
    }
}

impl PasswordPolicy {
    /// Every rule the password breaks
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut violations = Vec::new();
        if password.chars().count() < self.min_length {
            violations.push(format!("must be at least {} characters", self.min_length));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("must contain a digit".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            violations.push("must contain a lowercase letter".to_string());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            violations.push("must contain an uppercase letter".to_string());
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_alphanumeric()) {
            violations.push("must contain a non-alphanumeric character".to_string());
        }
        violations
    }

    pub fn check(&self, password: &str) -> DirectoryResult<()> {
        let violations = self.violations(password);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DirectoryError::PasswordPolicy(violations.join(", ")))
        }
    }
}

/// Argon2 hash in PHC string format
pub fn hash_password(password: &str) -> DirectoryResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DirectoryError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Random alphanumeric token for password resets and email changes
pub fn generate_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_accepts_seed_password() {
        assert!(PasswordPolicy::default().check("1qa2ws#ED").is_ok());
    }

    #[test]
    fn test_violations() {
        let policy = PasswordPolicy::default();
        let violations = policy.violations("abc");
        assert_eq!(violations.len(), 4);
        assert!(violations[0].contains("at least 5"));

        assert!(matches!(
            policy.check("Abcde1"),
            Err(DirectoryError::PasswordPolicy(ref m)) if m.contains("non-alphanumeric")
        ));
    }

    #[test]
    fn test_relaxed_policy() {
        let policy = PasswordPolicy {
            min_length: 1,
            require_digit: false,
            require_lowercase: false,
            require_uppercase: false,
            require_non_alphanumeric: false,
        };
        assert!(policy.check("x").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("1qa2ws#ED").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("1qa2ws#ED", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("1qa2ws#ED", "not-a-hash"));
    }

    #[test]
    fn test_tokens_are_random() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
