use crate::convert::{admission_draft, admission_filter, admission_res};
use crate::error::ApiError;
use crate::extract::AuthSession;
use crate::{today, AppState};
use api_shared::{
    AdmissionFormReq, AdmissionRes, AdmissionSummaryRes, ErrorRes, ListAdmissionsQuery,
    ListAdmissionsRes,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use trauma_core::{AdmissionService, PageRequest, Session};

fn service(state: &AppState, session: &Session) -> AdmissionService {
    AdmissionService::for_session(state.backend.as_ref(), session)
}

#[utoipa::path(
    get,
    path = "/admissions",
    params(ListAdmissionsQuery),
    responses(
        (status = 200, description = "One page of admissions, newest first", body = ListAdmissionsRes),
        (status = 400, description = "Malformed filter", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes),
        (status = 502, description = "Store error", body = ErrorRes)
    )
)]
/// List admissions filtered by patient search text, injury date and status.
///
/// Search text matching no patient yields an empty page.
#[axum::debug_handler]
pub(crate) async fn list_admissions(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<ListAdmissionsQuery>,
) -> Result<Json<ListAdmissionsRes>, ApiError> {
    let filter = admission_filter(&query)?;
    let page = PageRequest::admissions(query.page.unwrap_or(1));
    let result = service(&state, &session).list(&filter, page).await?;

    let today = today();
    Ok(Json(ListAdmissionsRes {
        total_pages: result.total_pages(),
        admissions: result.rows.iter().map(|a| admission_res(a, today)).collect(),
        total_count: result.total_count,
        page: result.page,
        page_size: result.page_size,
    }))
}

#[utoipa::path(
    post,
    path = "/admissions",
    request_body = AdmissionFormReq,
    responses(
        (status = 201, description = "Admission created as ADMITTED", body = AdmissionRes),
        (status = 400, description = "Validation error", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes),
        (status = 502, description = "Store error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn create_admission(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(form): Json<AdmissionFormReq>,
) -> Result<(StatusCode, Json<AdmissionRes>), ApiError> {
    let draft = admission_draft(form);
    let admission = service(&state, &session).create(&draft).await?;
    Ok((StatusCode::CREATED, Json(admission_res(&admission, today()))))
}

#[utoipa::path(
    get,
    path = "/admissions/{id}",
    params(("id" = String, Path, description = "Admission id")),
    responses(
        (status = 200, description = "The admission with its patient", body = AdmissionRes),
        (status = 404, description = "No such admission", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_admission(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<AdmissionRes>, ApiError> {
    let admission = service(&state, &session).get(&id).await?;
    Ok(Json(admission_res(&admission, today())))
}

#[utoipa::path(
    put,
    path = "/admissions/{id}",
    params(("id" = String, Path, description = "Admission id")),
    request_body = AdmissionFormReq,
    responses(
        (status = 200, description = "Clinical fields updated", body = AdmissionRes),
        (status = 400, description = "Validation error", body = ErrorRes),
        (status = 404, description = "No such admission", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
/// Apply the edit form. Status and patient are not changed.
#[axum::debug_handler]
pub(crate) async fn update_admission(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Json(form): Json<AdmissionFormReq>,
) -> Result<Json<AdmissionRes>, ApiError> {
    let draft = admission_draft(form);
    let admission = service(&state, &session).update(&id, &draft).await?;
    Ok(Json(admission_res(&admission, today())))
}

#[utoipa::path(
    post,
    path = "/admissions/{id}/discharge",
    params(("id" = String, Path, description = "Admission id")),
    responses(
        (status = 200, description = "Admission is DISCHARGED", body = AdmissionRes),
        (status = 404, description = "No such admission", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
/// Discharge an admission. Discharging twice is not an error.
#[axum::debug_handler]
pub(crate) async fn discharge_admission(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<AdmissionRes>, ApiError> {
    let admission = service(&state, &session).discharge(&id).await?;
    Ok(Json(admission_res(&admission, today())))
}

#[utoipa::path(
    get,
    path = "/admissions/{id}/summary",
    params(("id" = String, Path, description = "Admission id")),
    responses(
        (status = 200, description = "Chat-friendly text summary", body = AdmissionSummaryRes),
        (status = 404, description = "No such admission", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn admission_summary(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<AdmissionSummaryRes>, ApiError> {
    let text = service(&state, &session).summary(&id, today()).await?;
    Ok(Json(AdmissionSummaryRes {
        admission_id: id,
        text,
    }))
}
