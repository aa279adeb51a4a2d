//! # API REST
//!
//! REST facade for Trauma One.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - The route guard (bearer session) and error-to-status mapping
//!
//! Every handler builds its services for the caller's session from the shared [`Backend`];
//! no session is kept server-side. Uses `api-shared` for request and response bodies.

#![warn(rust_2018_idioms)]

mod admissions;
mod convert;
pub mod error;
pub mod extract;
mod patients;

use api_shared::{ErrorRes, HealthRes, HealthService, LoginReq, SessionRes};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use trauma_core::constants::MAX_PROFILE_PICTURE_BYTES;
use trauma_core::{Backend, CoreConfig};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::convert::session_res;
use crate::error::ApiError;
use crate::extract::AuthSession;

/// Application state for the REST API server
///
/// Configuration is resolved once at startup; the backend hands out session-scoped
/// repositories per request.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, backend: Arc<dyn Backend>) -> Self {
        Self { cfg, backend }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        login,
        logout,
        patients::list_patients,
        patients::create_patient,
        patients::get_patient,
        patients::update_patient,
        patients::patient_admissions,
        patients::upload_picture,
        patients::picture_url,
        admissions::list_admissions,
        admissions::create_admission,
        admissions::get_admission,
        admissions::update_admission,
        admissions::discharge_admission,
        admissions::admission_summary,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        LoginReq,
        SessionRes,
        api_shared::PatientRes,
        api_shared::PatientFormReq,
        api_shared::ListPatientsRes,
        api_shared::PictureUrlRes,
        api_shared::AdmissionFormReq,
        api_shared::AdmissionRes,
        api_shared::ListAdmissionsRes,
        api_shared::AdmissionSummaryRes,
    ))
)]
pub struct ApiDoc;

/// Builds the application router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:id",
            get(patients::get_patient).put(patients::update_patient),
        )
        .route("/patients/:id/admissions", get(patients::patient_admissions))
        .route(
            "/patients/:id/picture",
            put(patients::upload_picture).layer(DefaultBodyLimit::max(MAX_PROFILE_PICTURE_BYTES)),
        )
        .route("/patients/:id/picture-url", get(patients::picture_url))
        .route(
            "/admissions",
            get(admissions::list_admissions).post(admissions::create_admission),
        )
        .route(
            "/admissions/:id",
            get(admissions::get_admission).put(admissions::update_admission),
        )
        .route(
            "/admissions/:id/discharge",
            post(admissions::discharge_admission),
        )
        .route("/admissions/:id/summary", get(admissions::admission_summary))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The date ages and injury days are computed against.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks. Does not touch the store.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Signed in", body = SessionRes),
        (status = 401, description = "Credentials refused", body = ErrorRes),
        (status = 502, description = "Auth service unreachable", body = ErrorRes)
    )
)]
/// Sign in with email and password.
///
/// The returned access token authorises every other endpoint.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<SessionRes>, ApiError> {
    let session = state
        .backend
        .auth()
        .sign_in(&req.email, &req.password)
        .await
        .map_err(ApiError::from_sign_in)?;

    tracing::info!(
        user = session.user.as_ref().map(|u| u.id.as_str()).unwrap_or("-"),
        "signed in"
    );
    Ok(Json(session_res(&session)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Not signed in", body = ErrorRes)
    )
)]
/// End the caller's session. A failing store call is logged and otherwise ignored.
#[axum::debug_handler]
async fn logout(State(state): State<AppState>, AuthSession(session): AuthSession) -> StatusCode {
    if let Err(e) = state.backend.auth().sign_out(&session).await {
        tracing::warn!("Sign out error: {:?}", e);
    }
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use trauma_core::repositories::memory::MemoryBackend;

    const EMAIL: &str = "desk@trauma.one";
    const PASSWORD: &str = "secret";

    fn app() -> (Router, MemoryBackend) {
        let backend = MemoryBackend::new().with_user(EMAIL, PASSWORD);
        let state = AppState::new(
            Arc::new(CoreConfig::memory()),
            Arc::new(backend.clone()),
        );
        (router(state), backend)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn sign_in(app: &Router) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": EMAIL, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn create_patient(app: &Router, token: &str, first: &str, last: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/patients",
            Some(token),
            Some(json!({
                "first_name": first,
                "last_name": last,
                "sex": "Female",
                "birthdate": "1990-05-04",
                "hospital_registration_number": "HRN-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_does_not_need_a_session() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthenticated");

        let (status, _) = call(&app, Method::GET, "/admissions", Some("not-a-session"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refused_credentials_are_unauthorised() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": EMAIL, "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid login credentials");
    }

    #[tokio::test]
    async fn patient_registry_round_trip() {
        let (app, _) = app();
        let token = sign_in(&app).await;
        let id = create_patient(&app, &token, "Ana", "Reyes").await;
        create_patient(&app, &token, "Ben", "Cruz").await;

        let (status, body) =
            call(&app, Method::GET, &format!("/patients/{id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Ana Reyes");
        assert_eq!(body["birthdate"], "1990-05-04");

        let (status, body) =
            call(&app, Method::GET, "/patients?search=reye", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["page_size"], 15);
        assert_eq!(body["patients"][0]["id"], id.as_str());

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/patients/{id}"),
            Some(&token),
            Some(json!({
                "first_name": "Ana",
                "last_name": "Reyes-Santos",
                "sex": "Female",
                "blood_type": "O+"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["last_name"], "Reyes-Santos");
        assert_eq!(body["blood_type"], "O+");
        assert_eq!(body["age"], "-");
    }

    #[tokio::test]
    async fn validation_failure_is_bad_request_with_message() {
        let (app, _) = app();
        let token = sign_in(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/patients",
            Some(&token),
            Some(json!({ "first_name": " ", "last_name": "Reyes", "sex": "Female" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");
        assert_eq!(body["message"], "First name is required.");

        let id = create_patient(&app, &token, "Ana", "Reyes").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/admissions",
            Some(&token),
            Some(json!({ "patient_id": id, "chief_complaint": "Fall", "rr": "0" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Respiratory Rate (RR) must be a positive integer."
        );
    }

    #[tokio::test]
    async fn admission_lifecycle_over_http() {
        let (app, _) = app();
        let token = sign_in(&app).await;
        let patient_id = create_patient(&app, &token, "Ana", "Reyes").await;

        let (status, created) = call(
            &app,
            Method::POST,
            "/admissions",
            Some(&token),
            Some(json!({
                "patient_id": patient_id,
                "chief_complaint": "Fall from height",
                "date_of_injury": "2024-07-01",
                "time_of_injury": "14:30",
                "hr": "88",
                "spo2": "98",
                "severity": "severe"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "ADMITTED");
        assert_eq!(created["injury_datetime"], "Mon, 01 Jul 2024, 14:30");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, page) = call(
            &app,
            Method::GET,
            "/admissions?status=ADMITTED&search=reyes",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_count"], 1);
        assert_eq!(page["admissions"][0]["patient"]["full_name"], "Ana Reyes");

        let (status, updated) = call(
            &app,
            Method::PUT,
            &format!("/admissions/{id}"),
            Some(&token),
            Some(json!({ "chief_complaint": "Fall from ladder", "hr": "92" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["chief_complaint"], "Fall from ladder");
        assert_eq!(updated["status"], "ADMITTED");

        for _ in 0..2 {
            let (status, discharged) = call(
                &app,
                Method::POST,
                &format!("/admissions/{id}/discharge"),
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(discharged["status"], "DISCHARGED");
        }

        let (status, summary) = call(
            &app,
            Method::GET,
            &format!("/admissions/{id}/summary"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = summary["text"].as_str().unwrap();
        assert!(text.contains("*Patient Information:*"));
        assert!(text.contains("Name: Ana Reyes"));
        assert!(text.contains("Status: DISCHARGED"));

        let (status, history) = call(
            &app,
            Method::GET,
            &format!("/patients/{patient_id}/admissions"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_without_matching_patient_is_an_empty_page() {
        let (app, _) = app();
        let token = sign_in(&app).await;
        let patient_id = create_patient(&app, &token, "Ana", "Reyes").await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/admissions",
            Some(&token),
            Some(json!({ "patient_id": patient_id, "chief_complaint": "Burn" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, page) =
            call(&app, Method::GET, "/admissions?search=nobody", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_count"], 0);
        assert_eq!(page["total_pages"], 0);
        assert_eq!(page["admissions"], json!([]));
    }

    #[tokio::test]
    async fn unknown_records_are_not_found() {
        let (app, _) = app();
        let token = sign_in(&app).await;

        let (status, body) =
            call(&app, Method::GET, "/admissions/missing", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");

        let (status, _) = call(
            &app,
            Method::POST,
            "/admissions",
            Some(&token),
            Some(json!({ "patient_id": "missing", "chief_complaint": "Fall" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_filter_is_invalid_input() {
        let (app, _) = app();
        let token = sign_in(&app).await;
        let (status, body) = call(
            &app,
            Method::GET,
            "/admissions?date_of_injury=yesterday",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn expired_session_is_reported() {
        let (app, backend) = app();
        let token = sign_in(&app).await;
        backend.expire_session(&token);

        let (status, body) = call(&app, Method::GET, "/patients", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "session_expired");
    }

    #[tokio::test]
    async fn store_failure_surfaces_store_text() {
        let (app, backend) = app();
        let token = sign_in(&app).await;
        backend.set_failure(Some("canceling statement due to statement timeout"));

        let (status, body) = call(&app, Method::GET, "/admissions", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["message"],
            "canceling statement due to statement timeout"
        );
    }

    #[tokio::test]
    async fn picture_upload_then_signed_url() {
        let (app, backend) = app();
        let token = sign_in(&app).await;
        let id = create_patient(&app, &token, "Ana", "Reyes").await;

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/patients/{id}/picture-url"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], Value::Null);

        let request = Request::builder()
            .method(Method::PUT)
            .uri(format!("/patients/{id}/picture?ext=PNG"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(vec![1u8, 2, 3, 4]))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let path = format!("{id}.png");
        assert_eq!(backend.object_len("avatar", &path), Some(4));
        assert_eq!(
            backend.object_content_type("avatar", &path).as_deref(),
            Some("image/png")
        );

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/patients/{id}/picture-url"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().contains("expires_in=3600"));
    }

    async fn put_picture(app: &Router, token: &str, id: &str, len: usize) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(format!("/patients/{id}/picture?ext=jpg"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(vec![7u8; len]))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn phone_sized_pictures_fit_and_oversized_ones_get_an_error_body() {
        let (app, backend) = app();
        let token = sign_in(&app).await;
        let id = create_patient(&app, &token, "Ana", "Reyes").await;

        let (status, _) = put_picture(&app, &token, &id, 3 * 1024 * 1024).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            backend.object_len("avatar", &format!("{id}.jpg")),
            Some(3 * 1024 * 1024)
        );

        let (status, body) = put_picture(&app, &token, &id, MAX_PROFILE_PICTURE_BYTES + 1).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["code"], "payload_too_large");
        assert_eq!(body["message"], "Picture is larger than the 10 MB upload limit.");
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (app, _) = app();
        let token = sign_in(&app).await;

        let (status, _) = call(&app, Method::POST, "/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, Method::GET, "/patients", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
