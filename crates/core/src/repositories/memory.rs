//! In-process backend.
//!
//! Implements every repository trait over shared in-memory state. It honours the same
//! session rules as the hosted store: a handle created for an unknown token is
//! unauthenticated, and one whose token has been expired reports [`TraumaError::SessionExpired`].

use super::{AdmissionRepository, AuthProvider, Backend, ObjectStorage, PatientRepository};
use crate::admission::{Admission, AdmissionStatus, ClinicalRecord, NewAdmission};
use crate::patient::{Patient, PatientFields, PatientInsert};
use crate::query::{matches_patient_search, AdmissionQuery, Counted, PatientQuery, RowRange};
use crate::session::{Session, SessionUser};
use crate::{TraumaError, TraumaResult};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    seq: u64,
    patients: Vec<(u64, Patient)>,
    admissions: Vec<(u64, Admission)>,
    objects: HashMap<(String, String), StoredObject>,
    users: HashMap<String, (String, SessionUser)>,
    sessions: HashMap<String, SessionUser>,
    expired: HashSet<String>,
    patient_list_calls: usize,
    failure: Option<String>,
}

#[derive(Clone, Debug)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

impl MemoryState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn check(&self, token: &str) -> TraumaResult<()> {
        if self.expired.contains(token) {
            return Err(TraumaError::SessionExpired);
        }
        if !self.sessions.contains_key(token) {
            return Err(TraumaError::Unauthenticated);
        }
        if let Some(message) = &self.failure {
            return Err(TraumaError::store(None, message.clone()));
        }
        Ok(())
    }

    fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().map(|(_, p)| p).find(|p| p.id == id)
    }

    fn expand(&self, mut admission: Admission) -> Admission {
        admission.patient = self.patient(&admission.patient_id).cloned();
        admission
    }
}

fn window<T: Clone>(rows: &[T], range: Option<RowRange>) -> Vec<T> {
    match range {
        None => rows.to_vec(),
        Some(r) => rows
            .iter()
            .skip(r.from as usize)
            .take(r.limit() as usize)
            .cloned()
            .collect(),
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user that can sign in with `email` and `password`.
    pub fn with_user(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.lock();
            let user = SessionUser {
                id: Uuid::new_v4().to_string(),
                email: Some(email.to_string()),
            };
            state
                .users
                .insert(email.to_ascii_lowercase(), (password.to_string(), user));
        }
        self
    }

    /// Marks a session token as expired, as the hosted store would after its lifetime.
    pub fn expire_session(&self, access_token: &str) {
        let mut state = self.lock();
        state.sessions.remove(access_token);
        state.expired.insert(access_token.to_string());
    }

    /// Makes every subsequent row and storage call fail with `message`; `None` clears it.
    pub fn set_failure(&self, message: Option<&str>) {
        self.lock().failure = message.map(str::to_string);
    }

    /// Number of patient list queries served so far.
    pub fn patient_list_calls(&self) -> usize {
        self.lock().patient_list_calls
    }

    /// Content type recorded for a stored object.
    pub fn object_content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.content_type.clone())
    }

    pub fn object_len(&self, bucket: &str, path: &str) -> Option<usize> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.bytes.len())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self, session: &Session) -> MemoryHandle {
        MemoryHandle {
            backend: self.clone(),
            token: session.access_token.clone(),
        }
    }
}

impl Backend for MemoryBackend {
    fn auth(&self) -> Arc<dyn AuthProvider> {
        Arc::new(self.clone())
    }

    fn patients(&self, session: &Session) -> Arc<dyn PatientRepository> {
        Arc::new(self.handle(session))
    }

    fn admissions(&self, session: &Session) -> Arc<dyn AdmissionRepository> {
        Arc::new(self.handle(session))
    }

    fn storage(&self, session: &Session) -> Arc<dyn ObjectStorage> {
        Arc::new(self.handle(session))
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> TraumaResult<Session> {
        let mut state = self.lock();
        let user = match state.users.get(&email.trim().to_ascii_lowercase()) {
            Some((expected, user)) if expected == password => user.clone(),
            _ => {
                return Err(TraumaError::store(
                    Some("invalid_grant".into()),
                    "Invalid login credentials",
                ))
            }
        };

        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
            user: Some(user.clone()),
        };
        state.sessions.insert(session.access_token.clone(), user);
        Ok(session)
    }

    async fn current_user(&self, session: &Session) -> TraumaResult<SessionUser> {
        let state = self.lock();
        if state.expired.contains(&session.access_token) {
            return Err(TraumaError::SessionExpired);
        }
        state
            .sessions
            .get(&session.access_token)
            .cloned()
            .ok_or(TraumaError::Unauthenticated)
    }

    async fn sign_out(&self, session: &Session) -> TraumaResult<()> {
        let mut state = self.lock();
        if state.expired.contains(&session.access_token) {
            return Err(TraumaError::SessionExpired);
        }
        state.sessions.remove(&session.access_token);
        Ok(())
    }
}

/// Repository handle scoped to one access token.
struct MemoryHandle {
    backend: MemoryBackend,
    token: String,
}

impl MemoryHandle {
    fn state(&self) -> TraumaResult<MutexGuard<'_, MemoryState>> {
        let state = self.backend.lock();
        state.check(&self.token)?;
        Ok(state)
    }
}

#[async_trait]
impl PatientRepository for MemoryHandle {
    async fn search_ids(&self, text: &str) -> TraumaResult<Vec<String>> {
        let state = self.state()?;
        Ok(state
            .patients
            .iter()
            .filter(|(_, p)| matches_patient_search(p, text))
            .map(|(_, p)| p.id.clone())
            .collect())
    }

    async fn list(&self, query: &PatientQuery) -> TraumaResult<Counted<Patient>> {
        let mut state = self.state()?;
        state.patient_list_calls += 1;

        let mut matched: Vec<&(u64, Patient)> = state
            .patients
            .iter()
            .filter(|(_, p)| {
                query
                    .search
                    .as_deref()
                    .map_or(true, |text| matches_patient_search(p, text))
            })
            .collect();
        matched.sort_by(|a, b| b.0.cmp(&a.0));

        let rows: Vec<Patient> = matched.into_iter().map(|(_, p)| p.clone()).collect();
        Ok(Counted {
            total_count: rows.len() as u64,
            rows: window(&rows, query.range),
        })
    }

    async fn get(&self, id: &str) -> TraumaResult<Option<Patient>> {
        Ok(self.state()?.patient(id).cloned())
    }

    async fn insert(&self, insert: &PatientInsert) -> TraumaResult<Patient> {
        let mut state = self.state()?;
        let id = insert
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if state.patient(&id).is_some() {
            return Err(TraumaError::store(
                Some("23505".into()),
                "duplicate key value violates unique constraint \"patients_pkey\"",
            ));
        }

        let mut patient = Patient {
            id,
            first_name: String::new(),
            last_name: String::new(),
            birthdate: None,
            sex: insert.fields.sex,
            hospital_registration_number: None,
            blood_type: None,
            profile_picture: insert.profile_picture.clone(),
            created_at: Some(Utc::now()),
        };
        apply_fields(&mut patient, &insert.fields);

        let seq = state.next_seq();
        state.patients.push((seq, patient.clone()));
        Ok(patient)
    }

    async fn update(&self, id: &str, fields: &PatientFields) -> TraumaResult<Patient> {
        let mut state = self.state()?;
        let (_, patient) = state
            .patients
            .iter_mut()
            .find(|(_, p)| p.id == id)
            .ok_or_else(|| TraumaError::not_found("patient", id))?;
        apply_fields(patient, fields);
        Ok(patient.clone())
    }

    async fn set_profile_picture(&self, id: &str, path: &str) -> TraumaResult<Patient> {
        let mut state = self.state()?;
        let (_, patient) = state
            .patients
            .iter_mut()
            .find(|(_, p)| p.id == id)
            .ok_or_else(|| TraumaError::not_found("patient", id))?;
        patient.profile_picture = Some(path.to_string());
        Ok(patient.clone())
    }
}

fn apply_fields(patient: &mut Patient, fields: &PatientFields) {
    patient.first_name = fields.first_name.to_string();
    patient.last_name = fields.last_name.to_string();
    patient.birthdate = fields.birthdate;
    patient.sex = fields.sex;
    patient.hospital_registration_number = fields.hospital_registration_number.clone();
    patient.blood_type = fields.blood_type;
}

#[async_trait]
impl AdmissionRepository for MemoryHandle {
    async fn list(&self, query: &AdmissionQuery) -> TraumaResult<Counted<Admission>> {
        let state = self.state()?;

        let mut matched: Vec<&(u64, Admission)> = state
            .admissions
            .iter()
            .filter(|(_, a)| {
                query
                    .patient_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&a.patient_id))
            })
            .filter(|(_, a)| {
                query
                    .date_of_injury
                    .map_or(true, |d| a.clinical.injury.date_of_injury == Some(d))
            })
            .filter(|(_, a)| query.status.map_or(true, |s| a.status == s))
            .collect();
        matched.sort_by(|a, b| b.0.cmp(&a.0));

        let rows: Vec<Admission> = matched.into_iter().map(|(_, a)| a.clone()).collect();
        let total_count = rows.len() as u64;
        let mut rows = window(&rows, query.range);
        if query.expand_patient {
            rows = rows.into_iter().map(|a| state.expand(a)).collect();
        }
        Ok(Counted { rows, total_count })
    }

    async fn get(&self, id: &str) -> TraumaResult<Option<Admission>> {
        let state = self.state()?;
        Ok(state
            .admissions
            .iter()
            .find(|(_, a)| a.id == id)
            .map(|(_, a)| state.expand(a.clone())))
    }

    async fn insert(&self, new: &NewAdmission) -> TraumaResult<Admission> {
        let mut state = self.state()?;
        if state.patient(new.patient_id.as_str()).is_none() {
            return Err(TraumaError::store(
                Some("23503".into()),
                "insert or update on table \"admissions\" violates foreign key constraint \"admissions_patient_id_fkey\"",
            ));
        }

        let admission = Admission {
            id: Uuid::new_v4().to_string(),
            patient_id: new.patient_id.to_string(),
            clinical: new.clinical.clone(),
            status: new.status,
            created_at: Some(Utc::now()),
            patient: None,
        };
        let seq = state.next_seq();
        state.admissions.push((seq, admission.clone()));
        Ok(admission)
    }

    async fn update_clinical(&self, id: &str, clinical: &ClinicalRecord) -> TraumaResult<()> {
        let mut state = self.state()?;
        if let Some((_, admission)) = state.admissions.iter_mut().find(|(_, a)| a.id == id) {
            admission.clinical = clinical.clone();
        }
        Ok(())
    }

    async fn set_status(&self, id: &str, status: AdmissionStatus) -> TraumaResult<()> {
        let mut state = self.state()?;
        if let Some((_, admission)) = state.admissions.iter_mut().find(|(_, a)| a.id == id) {
            admission.status = status;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryHandle {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> TraumaResult<String> {
        let mut state = self.state()?;
        state.objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(path.to_string())
    }

    async fn signed_url(&self, bucket: &str, path: &str, ttl: Duration) -> TraumaResult<String> {
        let state = self.state()?;
        if !state
            .objects
            .contains_key(&(bucket.to_string(), path.to_string()))
        {
            return Err(TraumaError::store(Some("404".into()), "Object not found"));
        }
        Ok(format!(
            "memory://{bucket}/{path}?token={}&expires_in={}",
            Uuid::new_v4(),
            ttl.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{BirthdatePolicy, PatientDraft};
    use crate::query::PageRequest;
    use chrono::NaiveDate;

    async fn signed_in() -> (MemoryBackend, Session) {
        let backend = MemoryBackend::new().with_user("desk@trauma.one", "secret");
        let session = backend.sign_in("desk@trauma.one", "secret").await.unwrap();
        (backend, session)
    }

    fn fields(first: &str, last: &str) -> PatientFields {
        PatientDraft {
            first_name: first.into(),
            last_name: last.into(),
            sex: "Other".into(),
            ..Default::default()
        }
        .validate(
            BirthdatePolicy::Optional,
            NaiveDate::from_ymd_opt(2024, 7, 12).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_token_is_unauthenticated() {
        let backend = MemoryBackend::new();
        let repo = backend.patients(&Session::from_access_token("nope"));
        assert!(matches!(
            repo.search_ids("a").await,
            Err(TraumaError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn expired_token_reports_session_expired() {
        let (backend, session) = signed_in().await;
        backend.expire_session(&session.access_token);
        let repo = backend.admissions(&session);
        assert!(matches!(
            repo.get("a-1").await,
            Err(TraumaError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn patient_list_is_newest_first_and_paged() {
        let (backend, session) = signed_in().await;
        let repo = backend.patients(&session);
        for i in 0..20 {
            let insert = PatientInsert {
                id: None,
                fields: fields(&format!("P{i}"), "Test"),
                profile_picture: None,
            };
            repo.insert(&insert).await.unwrap();
        }

        let page = repo
            .list(&PatientQuery::page(None, PageRequest::patients(2)))
            .await
            .unwrap();
        assert_eq!(page.total_count, 20);
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0].first_name, "P4");
        assert_eq!(page.rows[4].first_name, "P0");
    }

    #[tokio::test]
    async fn admission_insert_requires_existing_patient() {
        let (backend, session) = signed_in().await;
        let repo = backend.admissions(&session);
        let new = NewAdmission {
            patient_id: trauma_types::NonEmptyText::new("ghost").unwrap(),
            clinical: ClinicalRecord::default(),
            status: AdmissionStatus::Admitted,
        };

        let err = repo.insert(&new).await.unwrap_err();
        assert!(err.user_message().contains("foreign key"));
    }

    #[tokio::test]
    async fn signed_url_requires_uploaded_object() {
        let (backend, session) = signed_in().await;
        let storage = backend.storage(&session);
        assert!(storage
            .signed_url("avatar", "p-1.png", Duration::from_secs(60))
            .await
            .is_err());

        storage
            .upload("avatar", "p-1.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        let url = storage
            .signed_url("avatar", "p-1.png", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("memory://avatar/p-1.png?token="));
        assert!(url.ends_with("expires_in=60"));
    }
}
