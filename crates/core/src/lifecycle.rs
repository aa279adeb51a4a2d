//! Admission lifecycle.
//!
//! ```text
//! ADMITTED --discharge--> DISCHARGED
//! ```
//!
//! `DISCHARGED` is terminal. Discharge is a status-only update; clinical fields are never
//! touched by it.

use crate::admission::{Admission, AdmissionStatus};
use crate::repositories::AdmissionRepository;
use crate::{TraumaError, TraumaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionEvent {
    Discharge,
}

impl AdmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AdmissionStatus::Discharged)
    }

    /// Whether the discharge action should be offered.
    pub fn can_discharge(&self) -> bool {
        !self.is_terminal()
    }

    /// Status after `event`. Discharging a discharged admission leaves it discharged.
    pub fn next(&self, event: AdmissionEvent) -> AdmissionStatus {
        match event {
            AdmissionEvent::Discharge => AdmissionStatus::Discharged,
        }
    }
}

/// Discharges an admission and returns it as re-read from the store.
///
/// No validation runs. Re-issuing the update for an already discharged admission is
/// harmless.
pub async fn discharge(repo: &dyn AdmissionRepository, id: &str) -> TraumaResult<Admission> {
    let next = AdmissionStatus::Admitted.next(AdmissionEvent::Discharge);
    repo.set_status(id, next).await?;

    let admission = repo
        .get(id)
        .await?
        .ok_or_else(|| TraumaError::not_found("admission", id))?;
    tracing::info!(admission_id = %id, status = %admission.status, "admission discharged");
    Ok(admission)
}
