use crate::{
    auth::{ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest},
    error::AppError,
    state::AppState,
};
use actix_web::{post, put, web, HttpResponse, Responder};
use serde_json::json;

/// Register a new user
///
/// Creates an account with role `user` or `recruiter` and returns it with a token.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let response = state.accounts.register(register_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// Login user
///
/// Authenticates a user and returns an authentication token.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let response = state.accounts.login(login_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Email a password reset link
#[post("/forgot-password")]
pub async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<impl Responder, AppError> {
    let message = state.accounts.forgot_password(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": message })))
}

/// Set a new password using the token from the reset link
#[put("/reset-password/{token}")]
pub async fn reset_password(
    state: web::Data<AppState>,
    token: web::Path<String>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<impl Responder, AppError> {
    let response = state
        .accounts
        .reset_password(&token, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}
