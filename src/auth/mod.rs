pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Role, User};

pub use extractors::Principal;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};

lazy_static! {
    // Letters (any script), spaces, apostrophes, dots and hyphens.
    static ref NAME_REGEX: regex::Regex = regex::Regex::new(r"^[\p{L}][\p{L} .'-]*$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Must be a valid email format.
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
///
/// Every field is optional at the serde level so that an incomplete body is
/// answered with a validation message instead of a deserialization error.
#[derive(Debug, Deserialize, Validate, Default)]
pub struct RegisterRequest {
    /// Display name. Between 2 and 80 characters, letters and common separators.
    #[validate(
        required(message = "Please provide a name"),
        length(min = 2, max = 80),
        regex(path = "NAME_REGEX", message = "Name contains invalid characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Please provide an email"),
        email(message = "Please provide a valid email")
    )]
    pub email: Option<String>,
    /// Must be at least 6 characters long.
    #[validate(
        required(message = "Please provide a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
    /// `user` or `recruiter`; defaults to `user`.
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Response structure after successful authentication (register, login or
/// password reset).
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// The JWT for session authentication.
    pub token: String,
}

impl AuthResponse {
    pub fn new(user: &User, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            role: None,
        }
    }

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            email: "cass@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let invalid_email_login = LoginRequest {
            email: "cass.example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(invalid_email_login.validate().is_err());

        let empty_password_login = LoginRequest {
            email: "cass@example.com".to_string(),
            password: String::new(),
        };
        assert!(empty_password_login.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        assert!(register("Grace Hopper", "grace@example.com", "password123")
            .validate()
            .is_ok());
        assert!(register("Renée O'Neil-Smith", "renee@example.com", "password123")
            .validate()
            .is_ok());

        assert!(register("R2D2!", "r2@example.com", "password123")
            .validate()
            .is_err());
        assert!(register("G", "g@example.com", "password123")
            .validate()
            .is_err());
        assert!(register("Grace", "grace@example.com", "short")
            .validate()
            .is_err());
        assert!(register("Grace", "not-an-email", "password123")
            .validate()
            .is_err());
    }

    #[test]
    fn test_register_request_requires_every_field() {
        let errors = RegisterRequest::default().validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
