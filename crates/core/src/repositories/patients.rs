//! Patient registry operations.
//!
//! ## Profile pictures
//!
//! Pictures live in the configured avatar bucket at `<patient_id>.<ext>`. Uploads replace
//! any existing object at that path. On create the picture is uploaded before the row is
//! inserted, so a failed upload leaves no patient behind.

use super::{AdmissionRepository, Backend, ObjectStorage, PatientRepository};
use crate::admission::Admission;
use crate::config::CoreConfig;
use crate::patient::{BirthdatePolicy, Patient, PatientDraft, PatientInsert};
use crate::query::{AdmissionQuery, Page, PageRequest, PatientQuery};
use crate::session::Session;
use crate::{TraumaError, TraumaResult};
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 5;

/// An image chosen by the operator.
#[derive(Debug, Clone)]
pub struct ProfilePicture {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ProfilePicture {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lower-cased extension of the file name, or `bin` when there is none.
    ///
    /// Only 1 to 5 ASCII alphanumerics count as an extension; anything else would leak
    /// into the storage path.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| {
                (1..=MAX_EXTENSION_LEN).contains(&ext.len())
                    && ext.bytes().all(|b| b.is_ascii_alphanumeric())
            })
            .unwrap_or_else(|| "bin".to_string())
    }

    pub fn storage_path(&self, patient_id: &str) -> String {
        format!("{patient_id}.{}", self.extension())
    }

    pub fn content_type(&self) -> String {
        mime_guess::from_ext(&self.extension())
            .first_or_octet_stream()
            .to_string()
    }
}

pub struct PatientService {
    cfg: Arc<CoreConfig>,
    patients: Arc<dyn PatientRepository>,
    admissions: Arc<dyn AdmissionRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl PatientService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        patients: Arc<dyn PatientRepository>,
        admissions: Arc<dyn AdmissionRepository>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            cfg,
            patients,
            admissions,
            storage,
        }
    }

    /// Builds the service from handles scoped to `session`.
    pub fn for_session(cfg: Arc<CoreConfig>, backend: &dyn Backend, session: &Session) -> Self {
        Self::new(
            cfg,
            backend.patients(session),
            backend.admissions(session),
            backend.storage(session),
        )
    }

    /// One page of patients, newest first, optionally filtered by search text.
    pub async fn list(&self, search: Option<&str>, page: PageRequest) -> TraumaResult<Page<Patient>> {
        let counted = self
            .patients
            .list(&PatientQuery::page(search, page))
            .await?;
        Ok(Page::from_counted(counted, page))
    }

    pub async fn get(&self, id: &str) -> TraumaResult<Patient> {
        self.patients
            .get(id)
            .await?
            .ok_or_else(|| TraumaError::not_found("patient", id))
    }

    /// Registers a patient with a client-generated id.
    ///
    /// The draft is validated before anything is written.
    pub async fn create(
        &self,
        draft: &PatientDraft,
        picture: Option<ProfilePicture>,
        policy: BirthdatePolicy,
        today: NaiveDate,
    ) -> TraumaResult<Patient> {
        let fields = draft.validate(policy, today)?;
        let id = Uuid::new_v4().to_string();

        let profile_picture = match picture {
            Some(picture) => Some(self.upload(&id, picture).await?),
            None => None,
        };

        let patient = self
            .patients
            .insert(&PatientInsert {
                id: Some(id),
                fields,
                profile_picture,
            })
            .await?;
        tracing::info!(patient_id = %patient.id, "patient created");
        Ok(patient)
    }

    /// Applies the edit form, then replaces the picture if a new one was chosen.
    pub async fn update(
        &self,
        id: &str,
        draft: &PatientDraft,
        picture: Option<ProfilePicture>,
        policy: BirthdatePolicy,
        today: NaiveDate,
    ) -> TraumaResult<Patient> {
        let fields = draft.validate(policy, today)?;
        let patient = self.patients.update(id, &fields).await?;

        match picture {
            Some(picture) => self.update_profile_picture(id, picture).await,
            None => Ok(patient),
        }
    }

    pub async fn update_profile_picture(
        &self,
        id: &str,
        picture: ProfilePicture,
    ) -> TraumaResult<Patient> {
        self.get(id).await?;
        let path = self.upload(id, picture).await?;
        self.patients.set_profile_picture(id, &path).await
    }

    /// A time-limited URL for the patient's picture, or `None` when there is no picture.
    pub async fn profile_picture_url(&self, id: &str) -> TraumaResult<Option<String>> {
        let patient = self.get(id).await?;
        let Some(path) = patient.profile_picture else {
            return Ok(None);
        };
        let url = self
            .storage
            .signed_url(self.cfg.avatar_bucket(), &path, self.cfg.signed_url_ttl())
            .await?;
        Ok(Some(url))
    }

    /// Every admission of the patient, newest first.
    pub async fn admission_history(&self, id: &str) -> TraumaResult<Vec<Admission>> {
        let counted = self
            .admissions
            .list(&AdmissionQuery::for_patient(id))
            .await?;
        Ok(counted.rows)
    }

    async fn upload(&self, patient_id: &str, picture: ProfilePicture) -> TraumaResult<String> {
        let path = picture.storage_path(patient_id);
        let content_type = picture.content_type();
        self.storage
            .upload(self.cfg.avatar_bucket(), &path, picture.bytes, &content_type)
            .await
    }
}
