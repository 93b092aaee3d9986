//!
//! # Custom Error Handling
//!
//! This module defines the `AppError` type used by every service and handler.
//! Each variant maps onto one HTTP status and is rendered as the
//! `{"success": false, "message": "..."}` envelope the client expects.
//!
//! `Database` and `Internal` carry a diagnostic message that is logged but never
//! sent to the caller; they surface as a generic 500.
//!
//! `From` implementations cover `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, `bcrypt::BcryptError`, the store's `StoreError`
//! and `actix_multipart::MultipartError`, so `?` works throughout.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::error;
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::store::StoreError;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed input (HTTP 400).
    Validation(String),
    /// No credential, or one that failed verification (HTTP 401).
    Unauthenticated(String),
    /// Role or ownership denial (HTTP 403).
    Forbidden(String),
    /// The requested resource does not exist (HTTP 404).
    NotFound(String),
    /// Duplicate application or an illegal status transition (HTTP 409).
    Conflict(String),
    /// Registration with an email that is already taken (HTTP 400).
    DuplicateEmail,
    /// A per-user cap was reached, e.g. the job alert limit (HTTP 400).
    LimitExceeded(String),
    /// An external collaborator (file store, mailer) failed and the caller
    /// cannot be served without it (HTTP 502).
    Upstream(String),
    /// Persistence failure (HTTP 500, message withheld).
    Database(String),
    /// Any other unexpected failure (HTTP 500, message withheld).
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::DuplicateEmail => write!(f, "Conflict: email already registered"),
            AppError::LimitExceeded(msg) => write!(f, "Limit Exceeded: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream Failure: {}", msg),
            AppError::Database(msg) => write!(f, "Database Error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl AppError {
    /// The message shown to the client. Internal details stay in the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::LimitExceeded(msg)
            | AppError::Upstream(msg) => msg.clone(),
            AppError::DuplicateEmail => "User already exists".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "Server error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateEmail | AppError::LimitExceeded(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(self, AppError::Database(_) | AppError::Internal(_)) {
            error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.public_message()
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound => AppError::NotFound("Record not found".into()),
            StoreError::LimitExceeded(msg) => AppError::LimitExceeded(msg),
            StoreError::Unavailable(msg) => AppError::Database(msg),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error.to_string())
    }
}

/// JWT processing failures mean the credential cannot be trusted.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthenticated(format!("Invalid token: {}", error))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(error.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::Validation(format!("Malformed multipart body: {}", error))
    }
}
