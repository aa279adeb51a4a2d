use crate::patients::PatientRes;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// The admission form, as typed across all wizard steps.
///
/// Numeric vitals are sent as text and validated server-side so the operator gets the
/// same messages as on the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct AdmissionFormReq {
    /// Ignored on update.
    pub patient_id: String,

    pub chief_complaint: String,
    pub nature_of_injury: String,
    /// `YYYY-MM-DD`.
    pub date_of_injury: String,
    /// `HH:MM` or `HH:MM:SS`.
    pub time_of_injury: String,
    pub place_of_injury: String,

    pub history_of_present_illness: String,
    pub past_medical_history: String,
    pub personal_social_history: String,
    pub obstetric_gynecologic_history: String,

    pub blood_pressure: String,
    pub hr: String,
    pub rr: String,
    pub spo2: String,
    pub temperature: String,

    pub physical_examination: String,
    pub imaging_findings: String,
    pub laboratory: String,

    pub diagnosis: String,
    pub initial_management: String,
    pub surgical_plan: String,
    pub surgery_done: Option<bool>,
    pub surgery_done_at: String,
    pub remarks: String,

    /// `critical`, `severe`, `moderate` or `mild`.
    pub severity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdmissionRes {
    pub id: String,
    pub patient_id: String,
    /// Present when the patient was fetched with the admission.
    pub patient: Option<PatientRes>,
    /// `ADMITTED` or `DISCHARGED`.
    pub status: String,
    pub severity: Option<String>,

    pub chief_complaint: String,
    pub nature_of_injury: Option<String>,
    pub date_of_injury: Option<String>,
    pub time_of_injury: Option<String>,
    /// Display form of the injury date and time, or `-`.
    pub injury_datetime: String,
    /// Days since the injury as of today.
    pub injury_day: Option<i64>,
    pub place_of_injury: Option<String>,

    pub history_of_present_illness: Option<String>,
    pub past_medical_history: Option<String>,
    pub personal_social_history: Option<String>,
    pub obstetric_gynecologic_history: Option<String>,

    pub blood_pressure: Option<String>,
    pub hr: Option<u32>,
    pub rr: Option<u32>,
    pub spo2: Option<u8>,
    pub temperature: Option<f64>,

    pub physical_examination: Option<String>,
    pub imaging_findings: Option<String>,
    pub laboratory: Option<String>,

    pub diagnosis: Option<String>,
    pub initial_management: Option<String>,
    pub surgical_plan: Option<String>,
    pub surgery_done: Option<bool>,
    pub surgery_done_at: Option<String>,
    pub remarks: Option<String>,

    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAdmissionsQuery {
    /// Matches the patient's first name, last name or hospital registration number.
    pub search: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_of_injury: Option<String>,
    /// `ADMITTED`, `DISCHARGED` or `ALL`.
    pub status: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListAdmissionsRes {
    pub admissions: Vec<AdmissionRes>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdmissionSummaryRes {
    pub admission_id: String,
    pub text: String,
}
