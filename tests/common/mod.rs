#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use jobboard::auth::{hash_password, AuthMiddleware, AuthResponse};
use jobboard::config::Config;
use jobboard::files::MemoryFileStore;
use jobboard::models::{Role, User};
use jobboard::notify::MemoryMailer;
use jobboard::routes::{self, health, uploads};
use jobboard::state::AppState;
use jobboard::store::{MemoryStore, UserStore};

pub const PASSWORD: &str = "Password123!";
const BOUNDARY: &str = "jobboard-test-boundary";

pub fn test_config() -> Config {
    Config {
        database_url: None,
        server_port: 0,
        server_host: "127.0.0.1".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_ttl_hours: 1,
        bcrypt_cost: 4,
        upload_dir: "./uploads".to_string(),
        public_url: "http://files.test".to_string(),
        upload_timeout: Duration::from_millis(200),
        reset_token_ttl_minutes: 10,
        client_url: "http://client.test".to_string(),
    }
}

/// Everything a test may want to inspect besides HTTP responses.
pub struct TestContext {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub files: Arc<MemoryFileStore>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_files(MemoryFileStore::new())
    }

    /// Must be called from inside an actix/tokio runtime.
    pub fn with_files(files: MemoryFileStore) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let files = Arc::new(files);
        let state = web::Data::new(AppState::new(
            &test_config(),
            store.clone(),
            files.clone(),
            mailer.clone(),
        ));
        Self {
            state,
            store,
            mailer,
            files,
        }
    }

    /// Admins cannot self-register, so they are written straight to the store.
    pub async fn seed_admin(&self, email: &str) -> User {
        let hash = hash_password(PASSWORD, 4).unwrap();
        self.store
            .insert_user(User::new("Site Admin".to_string(), email, hash, Role::Admin))
            .await
            .unwrap()
    }
}

pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    init_app_serving(state, test_config().upload_dir).await
}

/// The full app, with `/uploads` served from `upload_dir`.
pub async fn init_app_serving(
    state: web::Data<AppState>,
    upload_dir: String,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    let tokens = state.tokens.clone();
    let store = state.store.clone();
    test::init_service(
        App::new()
            .app_data(state)
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .service(health::health)
            .configure(|cfg| uploads::mount(cfg, &upload_dir))
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(tokens, store))
                    .configure(routes::config),
            ),
    )
    .await
}

/// Helper struct to hold auth details
pub struct TestUser {
    pub id: uuid::Uuid,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

pub async fn register(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
    role: &str,
) -> TestUser {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "name": name,
            "email": email,
            "password": PASSWORD,
            "role": role
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "registration of {} failed", email);
    let auth: AuthResponse = test::read_body_json(resp).await;
    TestUser {
        id: auth.id,
        token: auth.token,
    }
}

pub async fn login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> ServiceResponse<impl MessageBody> {
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": password }))
        .to_request();
    test::call_service(app, req).await
}

/// Posts a job as `owner` and returns its JSON.
pub async fn post_job(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    owner: &TestUser,
    title: &str,
    salary: f64,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/api/jobs")
        .append_header(owner.bearer())
        .set_json(&json!({
            "title": title,
            "company": "Initech",
            "description": "Build and run things",
            "location": "Berlin",
            "salary": salary,
            "experience": "3+ years",
            "skills": ["rust", "sql"],
            "jobType": "full-time"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "posting {} failed", title);
    test::read_body_json(resp).await
}

/// Builds a `multipart/form-data` body by hand.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            self.body,
        )
    }
}

/// `POST /api/applications/apply` with an optional resume file.
pub async fn apply(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    applicant: &TestUser,
    job_id: &str,
    resume: Option<&[u8]>,
) -> ServiceResponse<impl MessageBody> {
    let mut form = MultipartBody::new().text("jobId", job_id);
    if let Some(bytes) = resume {
        form = form.file("resume", "cv.pdf", "application/pdf", bytes);
    }
    let (content_type, body) = form.finish();
    let req = test::TestRequest::post()
        .uri("/api/applications/apply")
        .append_header(applicant.bearer())
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    test::call_service(app, req).await
}
