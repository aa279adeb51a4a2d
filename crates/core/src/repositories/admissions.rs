//! Admission registry operations.

use super::{AdmissionRepository, Backend, PatientRepository};
use crate::admission::{Admission, AdmissionDraft};
use crate::display::admission_summary;
use crate::lifecycle;
use crate::query::{AdmissionFilter, AdmissionQueryPlan, Page, PageRequest};
use crate::session::Session;
use crate::validation::{validate_admission_draft, validate_clinical};
use crate::{TraumaError, TraumaResult};
use chrono::NaiveDate;
use std::sync::Arc;

pub struct AdmissionService {
    patients: Arc<dyn PatientRepository>,
    admissions: Arc<dyn AdmissionRepository>,
}

impl AdmissionService {
    pub fn new(
        patients: Arc<dyn PatientRepository>,
        admissions: Arc<dyn AdmissionRepository>,
    ) -> Self {
        Self {
            patients,
            admissions,
        }
    }

    pub fn for_session(backend: &dyn Backend, session: &Session) -> Self {
        Self::new(backend.patients(session), backend.admissions(session))
    }

    /// One page of admissions matching `filter`, newest first, each with its patient.
    ///
    /// Search text is resolved against patients first; when no patient matches, the page
    /// is empty and the admissions table is not queried.
    pub async fn list(
        &self,
        filter: &AdmissionFilter,
        page: PageRequest,
    ) -> TraumaResult<Page<Admission>> {
        let matched = match filter.search_text() {
            Some(text) => Some(self.patients.search_ids(text).await?),
            None => None,
        };

        match filter.compose(page, matched) {
            AdmissionQueryPlan::Empty(page) => Ok(Page::empty(page)),
            AdmissionQueryPlan::Query(query) => {
                let counted = self.admissions.list(&query).await?;
                Ok(Page::from_counted(counted, page))
            }
        }
    }

    /// Fetches one admission with its patient expanded.
    pub async fn get(&self, id: &str) -> TraumaResult<Admission> {
        self.admissions
            .get(id)
            .await?
            .ok_or_else(|| TraumaError::not_found("admission", id))
    }

    /// Validates the complete draft and inserts it as a new `ADMITTED` admission.
    pub async fn create(&self, draft: &AdmissionDraft) -> TraumaResult<Admission> {
        let new = validate_admission_draft(draft)?;
        if self.patients.get(new.patient_id.as_str()).await?.is_none() {
            return Err(TraumaError::not_found("patient", new.patient_id.as_str()));
        }

        let admission = self.admissions.insert(&new).await?;
        tracing::info!(
            admission_id = %admission.id,
            patient_id = %admission.patient_id,
            "admission created"
        );
        Ok(admission)
    }

    /// Applies the edit form to the clinical fields. Status and patient are unchanged.
    pub async fn update(&self, id: &str, draft: &AdmissionDraft) -> TraumaResult<Admission> {
        let clinical = validate_clinical(draft)?;
        self.get(id).await?;
        self.admissions.update_clinical(id, &clinical).await?;
        self.get(id).await
    }

    pub async fn discharge(&self, id: &str) -> TraumaResult<Admission> {
        lifecycle::discharge(self.admissions.as_ref(), id).await
    }

    /// Chat-friendly text export of an admission and its patient.
    pub async fn summary(&self, id: &str, today: NaiveDate) -> TraumaResult<String> {
        let admission = self.get(id).await?;
        let patient = match &admission.patient {
            Some(patient) => patient.clone(),
            None => self
                .patients
                .get(&admission.patient_id)
                .await?
                .ok_or_else(|| TraumaError::not_found("patient", &admission.patient_id))?,
        };
        Ok(admission_summary(&patient, &admission, today))
    }
}
