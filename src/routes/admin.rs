use crate::{auth::Principal, error::AppError, state::AppState};
use actix_web::{delete, get, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

/// Totals of users, jobs and applications.
#[get("/stats")]
pub async fn stats(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.admin.stats(&principal).await?))
}

/// Job counts by type and the five most applied-to jobs.
#[get("/analytics/jobs")]
pub async fn job_analytics(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.admin.job_analytics(&principal).await?))
}

#[get("/users")]
pub async fn list_users(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.admin.list_users(&principal).await?))
}

#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    principal: Principal,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    state
        .admin
        .delete_user(&principal, user_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "User removed" })))
}
