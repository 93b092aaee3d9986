mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use pretty_assertions::assert_eq;
use serde_json::Value;

use common::{apply, init_app, login, post_job, register, TestContext, TestUser, PASSWORD};

async fn admin_user(
    ctx: &TestContext,
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
) -> TestUser {
    let admin = ctx.seed_admin("admin@example.com").await;
    let resp = login(app, "admin@example.com", PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    TestUser {
        id: admin.id,
        token: body["token"].as_str().unwrap().to_string(),
    }
}

#[actix_rt::test]
async fn test_admin_stats_and_analytics() {
    let ctx = TestContext::new();
    let app = init_app(ctx.state.clone()).await;
    let admin = admin_user(&ctx, &app).await;
    let recruiter = register(&app, "Rita Recruiter", "rita@example.com", "recruiter").await;
    let first = register(&app, "Cass Candidate", "cass@example.com", "user").await;
    let second = register(&app, "Dana Candidate", "dana@example.com", "user").await;

    let popular = post_job(&app, &recruiter, "Popular Role", 100000.0).await;
    post_job(&app, &recruiter, "Quiet Role", 90000.0).await;
    for candidate in [&first, &second] {
        let resp = apply(
            &app,
            candidate,
            popular["id"].as_str().unwrap(),
            Some(&b"%PDF-1.4"[..]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/admin/stats")
        .append_header(admin.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Value = test::read_body_json(resp).await;
    assert_eq!(stats["users"]["total"], 4);
    assert_eq!(stats["users"]["recruiters"], 1);
    assert_eq!(stats["users"]["admins"], 1);
    assert_eq!(stats["jobs"]["open"], 2);
    assert_eq!(stats["applications"]["pending"], 2);

    let req = test::TestRequest::get()
        .uri("/api/admin/analytics/jobs")
        .append_header(admin.bearer())
        .to_request();
    let analytics: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(analytics["topJobs"][0]["title"], "Popular Role");
    assert_eq!(analytics["topJobs"][0]["applications"], 2);
    assert_eq!(analytics["byType"][0]["jobType"], "full-time");
    assert_eq!(analytics["byType"][0]["count"], 2);

    // Everyone else is turned away.
    let req = test::TestRequest::get()
        .uri("/api/admin/stats")
        .append_header(recruiter.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_admin_user_management() {
    let ctx = TestContext::new();
    let app = init_app(ctx.state.clone()).await;
    let admin = admin_user(&ctx, &app).await;
    let seeker = register(&app, "Sam Seeker", "sam@example.com", "user").await;

    let req = test::TestRequest::get()
        .uri("/api/admin/users")
        .append_header(admin.bearer())
        .to_request();
    let users: Vec<Value> = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|user| user.get("passwordHash").is_none()));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/users/{}", admin.id))
        .append_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/users/{}", seeker.id))
        .append_header(seeker.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/users/{}", seeker.id))
        .append_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/users/{}", seeker.id))
        .append_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_deleted_user_token_loses_access() {
    let ctx = TestContext::new();
    let app = init_app(ctx.state.clone()).await;
    let admin = admin_user(&ctx, &app).await;
    let recruiter = register(&app, "Rita Recruiter", "rita@example.com", "recruiter").await;
    post_job(&app, &recruiter, "Backend Specialist", 140000.0).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/users/{}", recruiter.id))
        .append_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/jobs")
        .append_header(recruiter.bearer())
        .set_json(&serde_json::json!({
            "title": "Ghost Job",
            "company": "Initech",
            "description": "Should never be posted",
            "location": "Berlin",
            "salary": 50000.0,
            "experience": "1+ years",
            "jobType": "full-time"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Not authorized, user not found");

    let req = test::TestRequest::get()
        .uri("/api/users/profile")
        .append_header(recruiter.bearer())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    // Public listing still works for the same stale token.
    let req = test::TestRequest::get()
        .uri("/api/jobs")
        .append_header(recruiter.bearer())
        .to_request();
    let page: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(page["total"], 1);
}
