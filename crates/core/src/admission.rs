//! Admission records.
//!
//! An admission row is stored flat; in memory its clinical columns are grouped by the
//! section of the intake form they belong to. The sections are flattened back on the wire,
//! so the grouping never changes the column names.

use crate::patient::Patient;
use crate::wire;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use trauma_types::NonEmptyText;

/// Where an admission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdmissionStatus {
    #[default]
    Admitted,
    Discharged,
}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Admitted => "ADMITTED",
            AdmissionStatus::Discharged => "DISCHARGED",
        }
    }

    /// Stored spellings that read as this status, matched ignoring case.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            AdmissionStatus::Admitted => &["ADMITTED"],
            AdmissionStatus::Discharged => &["DISCHARGED", "DISCHARGE"],
        }
    }
}

impl FromStr for AdmissionStatus {
    type Err = String;

    /// Accepts any letter case and the legacy `DISCHARGE` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [AdmissionStatus::Admitted, AdmissionStatus::Discharged]
            .into_iter()
            .find(|status| {
                status
                    .spellings()
                    .iter()
                    .any(|spelling| spelling.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| format!("unknown admission status '{s}'"))
    }
}

impl fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AdmissionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AdmissionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(AdmissionStatus::Admitted),
            Some(s) if s.trim().is_empty() => Ok(AdmissionStatus::Admitted),
            Some(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Triage severity tag.
///
/// Values outside the known vocabulary are kept verbatim so editing a record never
/// rewrites a tag the operator did not touch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    Severe,
    Moderate,
    Mild,
    Unrecognised(String),
}

impl Severity {
    pub const KNOWN: [Severity; 4] = [
        Severity::Critical,
        Severity::Severe,
        Severity::Moderate,
        Severity::Mild,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::Severe => "severe",
            Severity::Moderate => "moderate",
            Severity::Mild => "mild",
            Severity::Unrecognised(raw) => raw,
        }
    }
}

impl FromStr for Severity {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(Severity::KNOWN
            .into_iter()
            .find(|known| known.as_str().eq_ignore_ascii_case(s))
            .unwrap_or_else(|| Severity::Unrecognised(s.to_string())))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InjuryDetails {
    #[serde(default, deserialize_with = "wire::null_as_empty")]
    pub chief_complaint: String,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub nature_of_injury: Option<String>,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub date_of_injury: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::optional_time")]
    pub time_of_injury: Option<NaiveTime>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub place_of_injury: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub history_of_present_illness: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub past_medical_history: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub personal_social_history: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub obstetric_gynecologic_history: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, deserialize_with = "wire::optional_unsigned")]
    pub hr: Option<u32>,
    #[serde(default, deserialize_with = "wire::optional_unsigned")]
    pub rr: Option<u32>,
    #[serde(default, deserialize_with = "wire::optional_unsigned")]
    pub spo2: Option<u8>,
    #[serde(default, deserialize_with = "wire::optional_float")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Examination {
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub physical_examination: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub imaging_findings: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub laboratory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub diagnosis: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub initial_management: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub surgical_plan: Option<String>,
    #[serde(default, deserialize_with = "wire::optional_bool")]
    pub surgery_done: Option<bool>,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub surgery_done_at: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub remarks: Option<String>,
}

/// Every clinical column of an admission; what the edit form may change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    #[serde(flatten)]
    pub injury: InjuryDetails,
    #[serde(flatten)]
    pub history: History,
    #[serde(flatten)]
    pub vitals: Vitals,
    #[serde(flatten)]
    pub examination: Examination,
    #[serde(flatten)]
    pub plan: Plan,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub severity: Option<Severity>,
}

/// An admission row as stored, optionally with its patient expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub id: String,
    pub patient_id: String,
    #[serde(flatten)]
    pub clinical: ClinicalRecord,
    #[serde(default)]
    pub status: AdmissionStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "patients",
        skip_serializing_if = "Option::is_none"
    )]
    pub patient: Option<Patient>,
}

/// A validated admission ready to insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAdmission {
    pub patient_id: NonEmptyText,
    #[serde(flatten)]
    pub clinical: ClinicalRecord,
    pub status: AdmissionStatus,
}

/// The admission form as typed by the operator across all wizard steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionDraft {
    pub patient_id: String,

    pub chief_complaint: String,
    pub nature_of_injury: String,
    pub date_of_injury: String,
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

    pub severity: String,
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

impl AdmissionDraft {
    /// Prefills the edit form from a stored admission.
    pub fn from_admission(admission: &Admission) -> Self {
        let c = &admission.clinical;
        Self {
            patient_id: admission.patient_id.clone(),

            chief_complaint: c.injury.chief_complaint.clone(),
            nature_of_injury: text(&c.injury.nature_of_injury),
            date_of_injury: date(c.injury.date_of_injury),
            time_of_injury: c
                .injury
                .time_of_injury
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default(),
            place_of_injury: text(&c.injury.place_of_injury),

            history_of_present_illness: text(&c.history.history_of_present_illness),
            past_medical_history: text(&c.history.past_medical_history),
            personal_social_history: text(&c.history.personal_social_history),
            obstetric_gynecologic_history: text(&c.history.obstetric_gynecologic_history),

            blood_pressure: text(&c.vitals.blood_pressure),
            hr: number(c.vitals.hr),
            rr: number(c.vitals.rr),
            spo2: number(c.vitals.spo2),
            temperature: number(c.vitals.temperature),

            physical_examination: text(&c.examination.physical_examination),
            imaging_findings: text(&c.examination.imaging_findings),
            laboratory: text(&c.examination.laboratory),

            diagnosis: text(&c.plan.diagnosis),
            initial_management: text(&c.plan.initial_management),
            surgical_plan: text(&c.plan.surgical_plan),
            surgery_done: c.plan.surgery_done,
            surgery_done_at: date(c.plan.surgery_done_at),
            remarks: text(&c.plan.remarks),

            severity: c
                .severity
                .as_ref()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}
