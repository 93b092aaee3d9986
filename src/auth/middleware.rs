use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::debug;

use super::extractors::{InvalidCredential, Principal};
use super::token::TokenKeys;
use crate::error::AppError;
use crate::store::{Store, UserStore};

/// Resolves the bearer token, if any, into a `Principal` request extension.
///
/// Requests are never rejected here: public routes must work without a token,
/// so a bad token is recorded as `InvalidCredential` and the `Principal`
/// extractor turns it into a 401 on routes that need an actor.
///
/// The token subject is looked up on every request. A deleted account loses
/// access immediately, and the role comes from the stored user rather than
/// the claim.
pub struct AuthMiddleware {
    keys: TokenKeys,
    store: Arc<dyn Store>,
}

impl AuthMiddleware {
    pub fn new(keys: TokenKeys, store: Arc<dyn Store>) -> Self {
        Self { keys, store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    keys: TokenKeys,
    store: Arc<dyn Store>,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let keys = self.keys.clone();
        let store = self.store.clone();

        Box::pin(async move {
            if let Some(token) = bearer_token(&req) {
                match keys.verify(&token) {
                    Ok(claims) => match store.user_by_id(claims.sub).await {
                        Ok(Some(user)) => {
                            req.extensions_mut().insert(Principal {
                                id: user.id,
                                role: user.role,
                            });
                        }
                        Ok(None) => {
                            debug!("token subject {} no longer exists", claims.sub);
                            req.extensions_mut().insert(InvalidCredential(
                                "Not authorized, user not found".into(),
                            ));
                        }
                        Err(err) => return Err(AppError::from(err).into()),
                    },
                    Err(err) => {
                        debug!("rejected bearer token on {}: {}", req.path(), err);
                        req.extensions_mut()
                            .insert(InvalidCredential("Not authorized, token failed".into()));
                    }
                }
            }

            service.call(req).await
        })
    }
}
