//! Repository seams and the services built on them.
//!
//! The backing store is reached only through the traits here. `trauma-baas` implements
//! them over HTTP; [`memory`] implements them in process for tests and local development.
//! Every handle is scoped to the session it was created for.

pub mod admissions;
pub mod memory;
pub mod patients;

use crate::admission::{Admission, AdmissionStatus, ClinicalRecord, NewAdmission};
use crate::patient::{Patient, PatientFields, PatientInsert};
use crate::query::{AdmissionQuery, Counted, PatientQuery};
use crate::session::{Session, SessionUser};
use crate::TraumaResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Ids of patients whose first name, last name or registration number contains `text`
    /// (case-insensitive).
    async fn search_ids(&self, text: &str) -> TraumaResult<Vec<String>>;

    async fn list(&self, query: &PatientQuery) -> TraumaResult<Counted<Patient>>;

    async fn get(&self, id: &str) -> TraumaResult<Option<Patient>>;

    /// Inserts a patient and returns the stored row.
    async fn insert(&self, patient: &PatientInsert) -> TraumaResult<Patient>;

    async fn update(&self, id: &str, fields: &PatientFields) -> TraumaResult<Patient>;

    async fn set_profile_picture(&self, id: &str, path: &str) -> TraumaResult<Patient>;
}

#[async_trait]
pub trait AdmissionRepository: Send + Sync {
    async fn list(&self, query: &AdmissionQuery) -> TraumaResult<Counted<Admission>>;

    /// Fetches one admission with its patient expanded.
    async fn get(&self, id: &str) -> TraumaResult<Option<Admission>>;

    async fn insert(&self, admission: &NewAdmission) -> TraumaResult<Admission>;

    /// Overwrites the clinical columns. Status and patient are left as they are.
    async fn update_clinical(&self, id: &str, clinical: &ClinicalRecord) -> TraumaResult<()>;

    /// Partial update of the status column only.
    async fn set_status(&self, id: &str, status: AdmissionStatus) -> TraumaResult<()>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads (or replaces) an object and returns its stored path.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> TraumaResult<String>;

    async fn signed_url(&self, bucket: &str, path: &str, ttl: Duration) -> TraumaResult<String>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> TraumaResult<Session>;

    async fn current_user(&self, session: &Session) -> TraumaResult<SessionUser>;

    async fn sign_out(&self, session: &Session) -> TraumaResult<()>;
}

/// A backing store: auth plus session-scoped row and object access.
pub trait Backend: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthProvider>;

    fn patients(&self, session: &Session) -> Arc<dyn PatientRepository>;

    fn admissions(&self, session: &Session) -> Arc<dyn AdmissionRepository>;

    fn storage(&self, session: &Session) -> Arc<dyn ObjectStorage>;
}
