use crate::{
    auth::Principal,
    error::AppError,
    models::{user::parse_skills, AlertInput, Experience, ProfileChanges},
    routes::form::FormData,
    services::ProfileUpdate,
    state::AppState,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveJobRequest {
    pub job_id: Uuid,
}

/// Toggles a job in the caller's saved set and returns the resulting set.
#[put("/saved-jobs")]
pub async fn toggle_saved_job(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<SaveJobRequest>,
) -> Result<impl Responder, AppError> {
    let saved = state.saved.toggle(&principal, body.job_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "savedJobs": saved })))
}

#[get("/saved-jobs")]
pub async fn saved_jobs(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    let jobs = state.saved.list(&principal).await?;
    Ok(HttpResponse::Ok().json(jobs))
}

#[get("/profile")]
pub async fn get_profile(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    let user = state.accounts.profile(&principal).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Updates the caller's profile.
///
/// Multipart text fields: `name`, `title`, `bio`, `location`, `skills`
/// (comma separated) and `experience` (JSON array). File fields: `avatar`
/// and `resume`.
#[put("/profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    principal: Principal,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut form = FormData::read(payload).await?;

    let experience = match form.text("experience") {
        Some(raw) if !raw.trim().is_empty() => Some(
            serde_json::from_str::<Vec<Experience>>(raw)
                .map_err(|e| AppError::Validation(format!("experience is not valid: {}", e)))?,
        ),
        _ => None,
    };
    let changes = ProfileChanges {
        name: form.text("name").map(str::to_string),
        title: form.text("title").map(str::to_string),
        bio: form.text("bio").map(str::to_string),
        location: form.text("location").map(str::to_string),
        skills: form.text("skills").map(parse_skills),
        experience,
    };
    let update = ProfileUpdate {
        changes,
        avatar: form.take_file("avatar"),
        resume: form.take_file("resume"),
    };

    let user = state.accounts.update_profile(&principal, update).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/alerts")]
pub async fn list_alerts(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<impl Responder, AppError> {
    let alerts = state.alerts.list(&principal).await?;
    Ok(HttpResponse::Ok().json(alerts))
}

/// Saves a search. At most five per user.
#[post("/alerts")]
pub async fn create_alert(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<AlertInput>,
) -> Result<impl Responder, AppError> {
    let alert = state.alerts.create(&principal, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(alert))
}

#[delete("/alerts/{id}")]
pub async fn delete_alert(
    state: web::Data<AppState>,
    principal: Principal,
    alert_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    state.alerts.delete(&principal, alert_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Alert removed" })))
}
