//! Patient and admission repositories over the row store.
//!
//! Rows are read as loose JSON first and decoded one at a time; a row that cannot be
//! decoded is skipped with a warning rather than failing the whole list.

use crate::client::BaasClient;
use crate::postgrest::{self, Params, ADMISSION_WITH_PATIENT};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use trauma_core::constants::{ADMISSIONS_TABLE, PATIENTS_TABLE};
use trauma_core::patient::PatientInsert;
use trauma_core::query::{AdmissionQuery, Counted, PatientQuery};
use trauma_core::{
    Admission, AdmissionRepository, AdmissionStatus, ClinicalRecord, NewAdmission, Patient,
    PatientFields, PatientRepository, TraumaError, TraumaResult,
};

pub struct BaasRows {
    client: BaasClient,
}

impl BaasRows {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }

    fn table(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.client.request(method, &format!("/rest/v1/{table}"))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, params: &Params) -> TraumaResult<Vec<T>> {
        let request = self.table(Method::GET, table).query(params);
        let rows: Vec<Value> = self.client.send_json(request).await?;
        Ok(decode_rows(table, rows))
    }

    /// Rows with the store's exact count. The count includes rows that fail to decode.
    async fn select_counted<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &Params,
    ) -> TraumaResult<Counted<T>> {
        let request = self
            .table(Method::GET, table)
            .query(params)
            .header("Prefer", "count=exact");
        let response = self.client.send(request).await?;

        let header = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| TraumaError::store(None, format!("unexpected backend response: {e}")))?;

        let total_count = match postgrest::total_from_content_range(header.as_deref()) {
            Some(total) => total,
            None => {
                let offset = postgrest::offset(params);
                tracing::warn!(
                    "{} response had no usable content-range; counting {} rows from offset {}",
                    table,
                    rows.len(),
                    offset
                );
                offset + rows.len() as u64
            }
        };
        Ok(Counted {
            rows: decode_rows(table, rows),
            total_count,
        })
    }

    /// Writes `body` and returns the first row of the representation.
    async fn write_returning<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        table: &str,
        body: &impl serde::Serialize,
    ) -> TraumaResult<Option<T>> {
        let request = request.header("Prefer", "return=representation").json(body);
        let rows: Vec<Value> = self.client.send_json(request).await?;
        Ok(decode_rows(table, rows).into_iter().next())
    }

    async fn write_minimal(
        &self,
        request: reqwest::RequestBuilder,
        body: &impl serde::Serialize,
    ) -> TraumaResult<()> {
        let request = request.header("Prefer", "return=minimal").json(body);
        self.client.send(request).await?;
        Ok(())
    }
}

fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(Value::as_str).unwrap_or("-").to_string();
            match serde_json::from_value::<T>(row) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!("skipping unreadable {} row {}: {}", table, id, e);
                    None
                }
            }
        })
        .collect()
}

fn by_id(id: &str) -> Params {
    vec![("id".into(), postgrest::eq(id))]
}

#[async_trait]
impl PatientRepository for BaasRows {
    async fn search_ids(&self, text: &str) -> TraumaResult<Vec<String>> {
        #[derive(serde::Deserialize)]
        struct IdRow {
            id: String,
        }

        let params: Params = vec![
            ("select".into(), "id".into()),
            ("or".into(), postgrest::search_filter(text)),
        ];
        let rows: Vec<IdRow> = self.select(PATIENTS_TABLE, &params).await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn list(&self, query: &PatientQuery) -> TraumaResult<Counted<Patient>> {
        self.select_counted(PATIENTS_TABLE, &postgrest::patient_params(query))
            .await
    }

    async fn get(&self, id: &str) -> TraumaResult<Option<Patient>> {
        let mut params = by_id(id);
        params.push(("select".into(), "*".into()));
        params.push(("limit".into(), "1".into()));
        let rows: Vec<Patient> = self.select(PATIENTS_TABLE, &params).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, patient: &PatientInsert) -> TraumaResult<Patient> {
        let request = self.table(Method::POST, PATIENTS_TABLE);
        self.write_returning(request, PATIENTS_TABLE, patient)
            .await?
            .ok_or_else(|| TraumaError::store(None, "patient insert returned no row"))
    }

    async fn update(&self, id: &str, fields: &PatientFields) -> TraumaResult<Patient> {
        let request = self.table(Method::PATCH, PATIENTS_TABLE).query(&by_id(id));
        self.write_returning(request, PATIENTS_TABLE, fields)
            .await?
            .ok_or_else(|| TraumaError::not_found("patient", id))
    }

    async fn set_profile_picture(&self, id: &str, path: &str) -> TraumaResult<Patient> {
        let request = self.table(Method::PATCH, PATIENTS_TABLE).query(&by_id(id));
        self.write_returning(request, PATIENTS_TABLE, &json!({ "profile_picture": path }))
            .await?
            .ok_or_else(|| TraumaError::not_found("patient", id))
    }
}

#[async_trait]
impl AdmissionRepository for BaasRows {
    async fn list(&self, query: &AdmissionQuery) -> TraumaResult<Counted<Admission>> {
        self.select_counted(ADMISSIONS_TABLE, &postgrest::admission_params(query))
            .await
    }

    async fn get(&self, id: &str) -> TraumaResult<Option<Admission>> {
        let mut params = by_id(id);
        params.push(("select".into(), ADMISSION_WITH_PATIENT.into()));
        params.push(("limit".into(), "1".into()));
        let rows: Vec<Admission> = self.select(ADMISSIONS_TABLE, &params).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, admission: &NewAdmission) -> TraumaResult<Admission> {
        let request = self.table(Method::POST, ADMISSIONS_TABLE);
        self.write_returning(request, ADMISSIONS_TABLE, admission)
            .await?
            .ok_or_else(|| TraumaError::store(None, "admission insert returned no row"))
    }

    async fn update_clinical(&self, id: &str, clinical: &ClinicalRecord) -> TraumaResult<()> {
        let request = self.table(Method::PATCH, ADMISSIONS_TABLE).query(&by_id(id));
        self.write_minimal(request, clinical).await
    }

    async fn set_status(&self, id: &str, status: AdmissionStatus) -> TraumaResult<()> {
        let request = self.table(Method::PATCH, ADMISSIONS_TABLE).query(&by_id(id));
        self.write_minimal(request, &json!({ "status": status })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client, spawn, Recorded};
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use trauma_core::query::{AdmissionFilter, AdmissionQueryPlan, PageRequest};

    async fn admissions_page(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        axum::extract::RawQuery(query): axum::extract::RawQuery,
    ) -> impl IntoResponse {
        recorded.push(headers, query);
        (
            [("content-range", "10-11/12")],
            Json(json!([
                {
                    "id": "a-11",
                    "patient_id": "p-1",
                    "chief_complaint": "Fall",
                    "hr": "90",
                    "status": null,
                    "patients": { "id": "p-1", "first_name": "Ana", "last_name": "Reyes", "sex": "Female" }
                },
                { "id": "a-12", "patient_id": "p-1", "chief_complaint": "Burn", "status": "LOST" }
            ])),
        )
    }

    #[tokio::test]
    async fn admission_list_sends_filters_and_reads_count() {
        let recorded = Recorded::default();
        let app = Router::new()
            .route("/rest/v1/admissions", get(admissions_page))
            .with_state(recorded.clone());
        let base = spawn(app).await;
        let rows = BaasRows::new(client(&base, Some("user-token")));

        let filter = AdmissionFilter {
            status: Some(AdmissionStatus::Admitted),
            ..Default::default()
        };
        let AdmissionQueryPlan::Query(query) = filter.compose(PageRequest::admissions(2), None)
        else {
            panic!("expected a query");
        };
        let counted = AdmissionRepository::list(&rows, &query).await.unwrap();

        assert_eq!(counted.total_count, 12);
        assert_eq!(counted.rows.len(), 1, "row with unknown status is skipped");
        assert_eq!(counted.rows[0].status, AdmissionStatus::Admitted);
        assert_eq!(counted.rows[0].clinical.vitals.hr, Some(90));

        let (headers, query) = recorded.last();
        let query = query.unwrap_or_default();
        assert!(query.contains("or=%28status.is.null%2C"));
        assert!(query.contains("offset=10"));
        assert!(query.contains("limit=10"));
        assert!(query.contains("order=created_at.desc"));
        assert_eq!(headers.get("prefer").unwrap(), "count=exact");
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer user-token");
    }

    /// Answers only the exact status filters the client is expected to send.
    async fn admissions_by_status(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let rows = match params.get("or").map(String::as_str) {
            Some(r#"(status.is.null,status.eq."",status.ilike."ADMITTED")"#) => json!([
                { "id": "a-1", "patient_id": "p-1", "chief_complaint": "Fall", "status": null },
                { "id": "a-2", "patient_id": "p-1", "chief_complaint": "Cut", "status": "admitted" }
            ]),
            Some(r#"(status.ilike."DISCHARGED",status.ilike."DISCHARGE")"#) => json!([
                { "id": "a-3", "patient_id": "p-1", "chief_complaint": "Burn", "status": "DISCHARGE" }
            ]),
            _ => json!([]),
        };
        Json(rows)
    }

    async fn list_by_status(rows: &BaasRows, status: AdmissionStatus, page: u32) -> Counted<Admission> {
        let filter = AdmissionFilter {
            status: Some(status),
            ..Default::default()
        };
        let AdmissionQueryPlan::Query(query) = filter.compose(PageRequest::admissions(page), None)
        else {
            panic!("expected a query");
        };
        AdmissionRepository::list(rows, &query).await.unwrap()
    }

    #[tokio::test]
    async fn status_filters_take_every_spelling_that_reads_back_as_the_status() {
        let app = Router::new().route("/rest/v1/admissions", get(admissions_by_status));
        let base = spawn(app).await;
        let rows = BaasRows::new(client(&base, Some("t")));

        let admitted = list_by_status(&rows, AdmissionStatus::Admitted, 1).await;
        let ids: Vec<&str> = admitted.rows.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a-1", "a-2"]);
        assert!(admitted
            .rows
            .iter()
            .all(|a| a.status == AdmissionStatus::Admitted));

        let discharged = list_by_status(&rows, AdmissionStatus::Discharged, 1).await;
        assert_eq!(discharged.rows.len(), 1);
        assert_eq!(discharged.rows[0].status, AdmissionStatus::Discharged);
    }

    #[tokio::test]
    async fn missing_content_range_counts_from_the_page_offset() {
        let app = Router::new().route("/rest/v1/admissions", get(admissions_by_status));
        let base = spawn(app).await;
        let rows = BaasRows::new(client(&base, Some("t")));

        let page = list_by_status(&rows, AdmissionStatus::Admitted, 2).await;
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total_count, 12);
    }

    #[tokio::test]
    async fn expired_jwt_maps_to_session_expired() {
        let app = Router::new().route(
            "/rest/v1/patients",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "code": "PGRST301", "message": "JWT expired" })),
                )
            }),
        );
        let base = spawn(app).await;
        let rows = BaasRows::new(client(&base, Some("stale")));

        let err = rows.search_ids("ana").await.unwrap_err();
        assert!(err.is_session_expired());
    }

    #[tokio::test]
    async fn patient_insert_posts_row_and_returns_representation() {
        let recorded = Recorded::default();
        let app = Router::new()
            .route(
                "/rest/v1/patients",
                axum::routing::post(
                    |State(recorded): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        recorded.push_body(headers, body.clone());
                        let mut row = body;
                        row["created_at"] = json!("2024-07-12T08:00:00Z");
                        (StatusCode::CREATED, Json(json!([row])))
                    },
                ),
            )
            .with_state(recorded.clone());
        let base = spawn(app).await;
        let rows = BaasRows::new(client(&base, Some("t")));

        let fields = trauma_core::PatientDraft {
            first_name: "Ana".into(),
            last_name: "Reyes".into(),
            sex: "Female".into(),
            blood_type: "A+".into(),
            ..Default::default()
        }
        .validate(
            trauma_core::BirthdatePolicy::Optional,
            chrono::NaiveDate::from_ymd_opt(2024, 7, 12).unwrap(),
        )
        .unwrap();
        let insert = PatientInsert {
            id: Some("p-77".into()),
            fields,
            profile_picture: None,
        };
        let patient = PatientRepository::insert(&rows, &insert).await.unwrap();

        assert_eq!(patient.id, "p-77");
        assert!(patient.created_at.is_some());
        let (headers, body) = recorded.last_body();
        assert_eq!(headers.get("prefer").unwrap(), "return=representation");
        assert_eq!(body["blood_type"], "A+");
        assert!(body["birthdate"].is_null());
    }

    #[tokio::test]
    async fn set_status_patches_status_only() {
        let recorded = Recorded::default();
        let app = Router::new()
            .route(
                "/rest/v1/admissions",
                axum::routing::patch(
                    |State(recorded): State<Recorded>,
                     headers: HeaderMap,
                     axum::extract::RawQuery(query): axum::extract::RawQuery,
                     Json(body): Json<Value>| async move {
                        recorded.push(headers.clone(), query);
                        recorded.push_body(headers, body);
                        StatusCode::NO_CONTENT
                    },
                ),
            )
            .with_state(recorded.clone());
        let base = spawn(app).await;
        let rows = BaasRows::new(client(&base, Some("t")));

        rows.set_status("a-1", AdmissionStatus::Discharged)
            .await
            .unwrap();

        let (_, query) = recorded.last();
        assert_eq!(query.as_deref(), Some("id=eq.a-1"));
        let (_, body) = recorded.last_body();
        assert_eq!(body, json!({ "status": "DISCHARGED" }));
    }
}
