use crate::{
    auth::Principal,
    error::AppError,
    models::{JobInput, JobPatch, JobQuery},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

/// Lists open jobs.
///
/// ## Query Parameters:
/// - `search` (optional): case-insensitive match on title or company.
/// - `location` (optional): exact location.
/// - `type` (optional): `full-time`, `part-time`, `internship` or `contract`.
/// - `minSalary` (optional): inclusive lower bound.
/// - `page`, `limit` (optional): 1-based page and page size (default 10, at most 100).
///
/// ## Responses:
/// - `200 OK`: `{jobs, total, page, pages}`, newest first.
/// - `400 Bad Request`: malformed query string.
#[get("")]
pub async fn list_jobs(
    state: web::Data<AppState>,
    query_params: web::Query<JobQuery>,
) -> Result<impl Responder, AppError> {
    let page = state.jobs.list(query_params.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Posts a job owned by the caller. Recruiters and admins only.
///
/// ## Responses:
/// - `201 Created`: the new job.
/// - `400 Bad Request`: a required field is missing or invalid.
/// - `401 Unauthorized` / `403 Forbidden`.
#[post("")]
pub async fn create_job(
    state: web::Data<AppState>,
    principal: Principal,
    job_data: web::Json<JobInput>,
) -> Result<impl Responder, AppError> {
    let job = state.jobs.create(&principal, job_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(job))
}

/// Jobs posted by the caller, newest first.
#[get("/my")]
pub async fn my_jobs(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    let jobs = state.jobs.list_mine(&principal).await?;
    Ok(HttpResponse::Ok().json(jobs))
}

#[get("/{id}")]
pub async fn get_job(
    state: web::Data<AppState>,
    job_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let job = state.jobs.get(job_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(job))
}

/// Updates a job. Owner or admin only; `postedBy` cannot change.
#[put("/{id}")]
pub async fn update_job(
    state: web::Data<AppState>,
    principal: Principal,
    job_id: web::Path<Uuid>,
    patch: web::Json<JobPatch>,
) -> Result<impl Responder, AppError> {
    let job = state
        .jobs
        .update(&principal, job_id.into_inner(), patch.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(job))
}

/// Deletes a job. Its pending applications are closed.
#[delete("/{id}")]
pub async fn delete_job(
    state: web::Data<AppState>,
    principal: Principal,
    job_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    state.jobs.delete(&principal, job_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Job removed" })))
}
