use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

const SPECIAL_CHARS: &str = "!@#$%^&*()_+{}[]:;<>,.?~\\/-";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Returns false on mismatch and on a malformed digest; a broken stored
/// hash must read as "wrong password", not as a server error.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "malformed password hash in credential record");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Collects every violated strength rule so the caller can report them all
/// in one response. An empty vec means the password is acceptable.
pub fn check_strength(password: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();
    if password.len() < 8 {
        violations.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        violations.push("Password must contain at least one letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("Password must contain at least one number");
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        violations.push("Password must contain at least one special character");
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple1!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn verify_is_false_on_malformed_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }

    #[test]
    fn hashes_are_salted_per_call() {
        let password = "Secur3P@ssw0rd!";
        let first = hash_password(password).expect("first hash");
        let second = hash_password(password).expect("second hash");
        assert_ne!(first, second);
        assert!(verify_password(password, &first));
        assert!(verify_password(password, &second));
    }

    #[test]
    fn strength_accepts_compliant_password() {
        assert!(check_strength("Str0ng!pass").is_empty());
    }

    #[test]
    fn strength_reports_all_violations_at_once() {
        let violations = check_strength("abc");
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().any(|v| v.contains("8 characters")));
        assert!(violations.iter().any(|v| v.contains("number")));
        assert!(violations.iter().any(|v| v.contains("special character")));
    }

    #[test]
    fn strength_flags_missing_letter() {
        let violations = check_strength("12345678!");
        assert_eq!(violations, vec!["Password must contain at least one letter"]);
    }
}
