//! Public download of stored resumes and avatars.

use actix_files::Files;
use actix_web::{get, web, HttpResponse};

use crate::files::PLACEHOLDER_RESUME_URL;

/// Served at `PLACEHOLDER_RESUME_URL` for applications whose upload failed.
const PLACEHOLDER_RESUME: &[u8] = include_bytes!("../../assets/resume-unavailable.pdf");

#[get("/uploads/resume-unavailable.pdf")]
pub async fn placeholder_resume() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .body(PLACEHOLDER_RESUME)
}

/// Mounts `/uploads` over `upload_dir`, the directory `LocalFileStore` writes to.
/// Lives outside `/api` and needs no token.
pub fn mount(cfg: &mut web::ServiceConfig, upload_dir: &str) {
    cfg.service(placeholder_resume)
        .service(Files::new("/uploads", upload_dir));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn test_placeholder_resume_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().to_string_lossy().into_owned();
        let app =
            test::init_service(App::new().configure(|cfg| mount(cfg, &upload_dir))).await;

        let req = test::TestRequest::get().uri(PLACEHOLDER_RESUME_URL).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/pdf"
        );
        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"%PDF-"));
    }

    #[actix_rt::test]
    async fn test_stored_file_is_served_and_missing_one_is_not() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("avatars")).unwrap();
        std::fs::write(dir.path().join("avatars").join("me.png"), b"png-bytes").unwrap();
        let upload_dir = dir.path().to_string_lossy().into_owned();
        let app =
            test::init_service(App::new().configure(|cfg| mount(cfg, &upload_dir))).await;

        let req = test::TestRequest::get().uri("/uploads/avatars/me.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(test::read_body(resp).await, "png-bytes");

        let req = test::TestRequest::get().uri("/uploads/avatars/other.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
