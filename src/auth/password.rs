use crate::error::AppError;
use bcrypt::{hash, verify};

/// Hashes with the configured cost (`BCRYPT_COST`).
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_round_trip_with_low_cost() {
        let hashed = hash_password("candidate-secret", 4).unwrap();

        assert!(hashed.starts_with("$2"));
        assert!(verify_password("candidate-secret", &hashed).unwrap());
        assert!(!verify_password("recruiter-secret", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("same-password", 4).unwrap();
        let second = hash_password("same-password", 4).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        // Depending on the bcrypt version this is an error or a plain mismatch.
        match verify_password("candidate-secret", "not-a-bcrypt-hash") {
            Ok(matched) => assert!(!matched),
            Err(AppError::Internal(msg)) => assert!(msg.contains("verification failed")),
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
}
