//! Handler-level smoke tests that run without a database.

use actix_web::{test, web, App, HttpResponse};

use prototype_repo_lib::api;
use prototype_repo_lib::error::{AppError, AppResult};

#[actix_web::test]
async fn health_returns_healthy() {
    let app = test::init_service(App::new().configure(api::configure_health_routes)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

async fn conflicted() -> AppResult<HttpResponse> {
    Err(AppError::Conflict(
        "Prototype has already been reviewed".to_string(),
    ))
}

async fn forbidden() -> AppResult<HttpResponse> {
    Err(AppError::Forbidden(
        "Only admins can assign storage locations".to_string(),
    ))
}

#[actix_web::test]
async fn app_errors_map_to_status_and_json_body() {
    let app = test::init_service(
        App::new()
            .route("/conflict", web::get().to(conflicted))
            .route("/forbidden", web::get().to(forbidden)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/conflict").to_request()).await;
    assert_eq!(resp.status().as_u16(), 409);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "CONFLICT");
    assert!(body["message"].as_str().unwrap().contains("already been reviewed"));

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/forbidden").to_request()).await;
    assert_eq!(resp.status().as_u16(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "FORBIDDEN");
}
