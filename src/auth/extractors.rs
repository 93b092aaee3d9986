use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Role;

/// The authenticated actor of a request.
///
/// Inserted into request extensions by `AuthMiddleware` once the bearer
/// token verified and its subject was found in the store. Handlers that need an actor take `Principal`; handlers
/// that merely accept one take `Option<Principal>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Marker left by `AuthMiddleware` when a bearer token was present but failed
/// verification or named a user that no longer exists.
#[derive(Debug, Clone)]
pub struct InvalidCredential(pub String);

impl FromRequest for Principal {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let extensions = req.extensions();
        if let Some(principal) = extensions.get::<Principal>() {
            return ready(Ok(*principal));
        }

        let reason = match extensions.get::<InvalidCredential>() {
            Some(InvalidCredential(reason)) => reason.clone(),
            None => "Not authorized, no token".to_string(),
        };
        ready(Err(AppError::Unauthenticated(reason).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_principal_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let expected = Principal {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        req.extensions_mut().insert(expected);

        let mut payload = Payload::None;
        let extracted = Principal::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(extracted, expected);
        assert!(extracted.is_admin());
    }

    #[actix_rt::test]
    async fn test_principal_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = Principal::from_request(&req, &mut payload).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_principal_extractor_reports_invalid_token() {
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut()
            .insert(InvalidCredential("Not authorized, token failed".into()));

        let mut payload = Payload::None;
        let err = Principal::from_request(&req, &mut payload).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
        assert!(err.to_string().contains("token failed"));
    }
}
