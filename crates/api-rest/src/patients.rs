use crate::convert::{admission_res, patient_draft, patient_res};
use crate::error::ApiError;
use crate::extract::AuthSession;
use crate::{today, AppState};
use api_shared::{
    AdmissionRes, ErrorRes, ListPatientsQuery, ListPatientsRes, PatientFormReq, PatientRes,
    PictureUploadQuery, PictureUrlRes,
};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use trauma_core::constants::MAX_PROFILE_PICTURE_BYTES;
use trauma_core::{PageRequest, PatientService, ProfilePicture, Session, TraumaError};

fn service(state: &AppState, session: &Session) -> PatientService {
    PatientService::for_session(state.cfg.clone(), state.backend.as_ref(), session)
}

#[utoipa::path(
    get,
    path = "/patients",
    params(ListPatientsQuery),
    responses(
        (status = 200, description = "One page of patients, newest first", body = ListPatientsRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes),
        (status = 502, description = "Store error", body = ErrorRes)
    )
)]
/// List patients, optionally filtered by name or registration number.
#[axum::debug_handler]
pub(crate) async fn list_patients(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<ListPatientsQuery>,
) -> Result<Json<ListPatientsRes>, ApiError> {
    let page = PageRequest::patients(query.page.unwrap_or(1));
    let result = service(&state, &session)
        .list(query.search.as_deref(), page)
        .await?;

    let today = today();
    Ok(Json(ListPatientsRes {
        total_pages: result.total_pages(),
        patients: result.rows.iter().map(|p| patient_res(p, today)).collect(),
        total_count: result.total_count,
        page: result.page,
        page_size: result.page_size,
    }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientFormReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 400, description = "Validation error", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes),
        (status = 502, description = "Store error", body = ErrorRes)
    )
)]
/// Register a patient. The id is generated here.
#[axum::debug_handler]
pub(crate) async fn create_patient(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(form): Json<PatientFormReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let (draft, policy) = patient_draft(form);
    let today = today();
    let patient = service(&state, &session)
        .create(&draft, None, policy, today)
        .await?;
    Ok((StatusCode::CREATED, Json(patient_res(&patient, today))))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = PatientRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_patient(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let patient = service(&state, &session).get(&id).await?;
    Ok(Json(patient_res(&patient, today())))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientFormReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 400, description = "Validation error", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_patient(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Json(form): Json<PatientFormReq>,
) -> Result<Json<PatientRes>, ApiError> {
    let (draft, policy) = patient_draft(form);
    let today = today();
    let patient = service(&state, &session)
        .update(&id, &draft, None, policy, today)
        .await?;
    Ok(Json(patient_res(&patient, today)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/admissions",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Every admission of the patient, newest first", body = [AdmissionRes]),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn patient_admissions(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Vec<AdmissionRes>>, ApiError> {
    let service = service(&state, &session);
    service.get(&id).await?;
    let admissions = service.admission_history(&id).await?;

    let today = today();
    Ok(Json(
        admissions.iter().map(|a| admission_res(a, today)).collect(),
    ))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/picture",
    params(
        ("id" = String, Path, description = "Patient id"),
        PictureUploadQuery
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Picture stored", body = PatientRes),
        (status = 400, description = "Empty body", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 413, description = "Picture larger than the upload limit", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
/// Upload (or replace) the patient's profile picture. The body is the raw image.
#[axum::debug_handler]
pub(crate) async fn upload_picture(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
    Query(query): Query<PictureUploadQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PatientRes>, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PictureTooLarge {
                limit_bytes: MAX_PROFILE_PICTURE_BYTES,
            }
        } else {
            TraumaError::InvalidInput(rejection.body_text()).into()
        }
    })?;
    if body.is_empty() {
        return Err(TraumaError::InvalidInput("picture body is empty".into()).into());
    }

    let file_name = match query.ext.as_deref().map(str::trim) {
        Some(ext) if !ext.is_empty() => format!("picture.{}", ext.trim_start_matches('.')),
        _ => "picture".to_string(),
    };
    let picture = ProfilePicture::new(file_name, body.to_vec());

    let patient = service(&state, &session)
        .update_profile_picture(&id, picture)
        .await?;
    Ok(Json(patient_res(&patient, today())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/picture-url",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Signed picture URL, or null", body = PictureUrlRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 401, description = "Not signed in or session expired", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn picture_url(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<PictureUrlRes>, ApiError> {
    let url = service(&state, &session).profile_picture_url(&id).await?;
    Ok(Json(PictureUrlRes { url }))
}
