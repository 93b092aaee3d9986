use crate::{
    auth::Principal,
    error::AppError,
    models::StatusUpdate,
    routes::form::FormData,
    state::AppState,
};
use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;

/// Applies to a job.
///
/// Multipart body: `jobId` text field and an optional `resume` file. Without a
/// file the resume on the applicant's profile is used.
///
/// ## Responses:
/// - `201 Created`: `{success, message, applicationId}`.
/// - `400 Bad Request`: missing `jobId` or no resume available.
/// - `404 Not Found`: unknown or closed job.
/// - `409 Conflict`: already applied.
#[post("/apply")]
pub async fn apply(
    state: web::Data<AppState>,
    principal: Principal,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut form = FormData::read(payload).await?;

    let job_id = form
        .text("jobId")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("jobId is required".into()))?;
    let job_id = Uuid::parse_str(job_id)
        .map_err(|_| AppError::Validation("jobId is not a valid id".into()))?;
    let resume = form.take_file("resume");

    let receipt = state.applications.apply(&principal, job_id, resume).await?;
    Ok(HttpResponse::Created().json(receipt))
}

#[get("/my")]
pub async fn my_applications(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    let applications = state.applications.list_mine(&principal).await?;
    Ok(HttpResponse::Ok().json(applications))
}

/// Applications across every job the caller posted.
#[get("/job-applicants")]
pub async fn job_applicants(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    let applications = state.applications.list_for_recruiter(&principal).await?;
    Ok(HttpResponse::Ok().json(applications))
}

#[get("/job/{job_id}")]
pub async fn applications_for_job(
    state: web::Data<AppState>,
    principal: Principal,
    job_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let applications = state
        .applications
        .list_for_job(&principal, job_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(applications))
}

/// Accepts or rejects a pending application. Job owner or admin only.
#[put("/{id}/status")]
pub async fn update_status(
    state: web::Data<AppState>,
    principal: Principal,
    application_id: web::Path<Uuid>,
    body: web::Json<StatusUpdate>,
) -> Result<impl Responder, AppError> {
    let application = state
        .applications
        .update_status(&principal, application_id.into_inner(), body.status)
        .await?;
    Ok(HttpResponse::Ok().json(application))
}
