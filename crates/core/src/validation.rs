//! Admission form validation.
//!
//! The admission wizard validates once, on the complete draft, when the operator submits.
//! Rules run in a fixed order and the first failure is the only message shown.

use crate::admission::{
    AdmissionDraft, AdmissionStatus, ClinicalRecord, Examination, History, InjuryDetails,
    NewAdmission, Plan, Severity, Vitals,
};
use crate::error::ValidationError;
use crate::wire;
use chrono::{NaiveDate, NaiveTime};
use trauma_types::{optional_text, NonEmptyText};

/// Returns true when `value` is one or more ASCII digits and nothing else.
///
/// Surrounding whitespace is not stripped: `" 7"` is not a count.
fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parses an optional strictly positive integer (`^[0-9]+$`, > 0).
fn positive_integer(value: &str, err: ValidationError) -> Result<Option<u32>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }
    if !is_digits(value) {
        return Err(err);
    }
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(err),
    }
}

fn oxygen_saturation(value: &str) -> Result<Option<u8>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }
    if !is_digits(value) {
        return Err(ValidationError::InvalidSpo2);
    }
    match value.parse::<u32>() {
        Ok(n) if n <= 100 => Ok(Some(n as u8)),
        _ => Err(ValidationError::InvalidSpo2),
    }
}

fn temperature(value: &str) -> Result<Option<f64>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(t) if t.is_finite() => Ok(Some(t)),
        _ => Err(ValidationError::InvalidTemperature),
    }
}

fn optional_date(value: &str, err: ValidationError) -> Result<Option<NaiveDate>, ValidationError> {
    match optional_text(value) {
        None => Ok(None),
        Some(raw) => wire::parse_date(&raw).map(Some).ok_or(err),
    }
}

fn optional_time(value: &str) -> Result<Option<NaiveTime>, ValidationError> {
    match optional_text(value) {
        None => Ok(None),
        Some(raw) => wire::parse_time(&raw)
            .map(Some)
            .ok_or(ValidationError::InvalidInjuryTime),
    }
}

/// Validates the clinical part of an admission form, as used by the edit form.
///
/// The patient is not checked here; an edit cannot change it.
pub fn validate_clinical(draft: &AdmissionDraft) -> Result<ClinicalRecord, ValidationError> {
    let chief_complaint = NonEmptyText::new(&draft.chief_complaint)
        .map_err(|_| ValidationError::MissingChiefComplaint)?;

    let rr = positive_integer(&draft.rr, ValidationError::InvalidRespiratoryRate)?;
    let hr = positive_integer(&draft.hr, ValidationError::InvalidHeartRate)?;
    let spo2 = oxygen_saturation(&draft.spo2)?;
    let temperature = temperature(&draft.temperature)?;

    let date_of_injury = optional_date(&draft.date_of_injury, ValidationError::InvalidInjuryDate)?;
    let time_of_injury = optional_time(&draft.time_of_injury)?;
    let surgery_done_at =
        optional_date(&draft.surgery_done_at, ValidationError::InvalidSurgeryDate)?;

    Ok(ClinicalRecord {
        injury: InjuryDetails {
            chief_complaint: chief_complaint.into_inner(),
            nature_of_injury: optional_text(&draft.nature_of_injury),
            date_of_injury,
            time_of_injury,
            place_of_injury: optional_text(&draft.place_of_injury),
        },
        history: History {
            history_of_present_illness: optional_text(&draft.history_of_present_illness),
            past_medical_history: optional_text(&draft.past_medical_history),
            personal_social_history: optional_text(&draft.personal_social_history),
            obstetric_gynecologic_history: optional_text(&draft.obstetric_gynecologic_history),
        },
        vitals: Vitals {
            blood_pressure: optional_text(&draft.blood_pressure),
            hr,
            rr,
            spo2,
            temperature,
        },
        examination: Examination {
            physical_examination: optional_text(&draft.physical_examination),
            imaging_findings: optional_text(&draft.imaging_findings),
            laboratory: optional_text(&draft.laboratory),
        },
        plan: Plan {
            diagnosis: optional_text(&draft.diagnosis),
            initial_management: optional_text(&draft.initial_management),
            surgical_plan: optional_text(&draft.surgical_plan),
            surgery_done: draft.surgery_done,
            surgery_done_at,
            remarks: optional_text(&draft.remarks),
        },
        severity: optional_text(&draft.severity).map(|s| match s.parse::<Severity>() {
            Ok(severity) => severity,
            Err(never) => match never {},
        }),
    })
}

/// Validates a complete admission draft and builds the insert.
///
/// New admissions always start as [`AdmissionStatus::Admitted`].
pub fn validate_admission_draft(draft: &AdmissionDraft) -> Result<NewAdmission, ValidationError> {
    let patient_id =
        NonEmptyText::new(&draft.patient_id).map_err(|_| ValidationError::MissingPatient)?;
    let clinical = validate_clinical(draft)?;

    Ok(NewAdmission {
        patient_id,
        clinical,
        status: AdmissionStatus::Admitted,
    })
}
