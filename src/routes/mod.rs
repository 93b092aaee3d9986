pub mod admin;
pub mod applications;
pub mod auth;
pub mod form;
pub mod health;
pub mod jobs;
pub mod uploads;
pub mod users;

use crate::error::AppError;
use actix_web::web;

/// Mounts every API scope. Expects to be configured under `/api` behind
/// [`crate::auth::AuthMiddleware`].
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register)
            .service(auth::forgot_password)
            .service(auth::reset_password),
    )
    .service(
        web::scope("/jobs")
            .service(jobs::list_jobs)
            .service(jobs::create_job)
            // `/my` must win over `/{id}`
            .service(jobs::my_jobs)
            .service(jobs::get_job)
            .service(jobs::update_job)
            .service(jobs::delete_job),
    )
    .service(
        web::scope("/applications")
            .service(applications::apply)
            .service(applications::my_applications)
            .service(applications::job_applicants)
            .service(applications::applications_for_job)
            .service(applications::update_status),
    )
    .service(
        web::scope("/users")
            .service(users::toggle_saved_job)
            .service(users::saved_jobs)
            .service(users::get_profile)
            .service(users::update_profile)
            .service(users::list_alerts)
            .service(users::create_alert)
            .service(users::delete_alert),
    )
    .service(
        web::scope("/admin")
            .service(admin::stats)
            .service(admin::job_analytics)
            .service(admin::list_users)
            .service(admin::delete_user),
    );
}
