//! Derived display values.
//!
//! Everything here is a pure function of stored values and a reference date. Absent values
//! render as [`EMPTY_DISPLAY`].

use crate::admission::Admission;
use crate::constants::EMPTY_DISPLAY;
use crate::patient::Patient;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use std::fmt::Write;

/// Whole years between `birthdate` and `as_of`.
///
/// A birthday later in the year than `as_of` has not been reached yet. A birthdate after
/// `as_of` yields 0.
pub fn age_in_years(birthdate: NaiveDate, as_of: NaiveDate) -> u32 {
    let mut years = as_of.year() - birthdate.year();
    if (as_of.month(), as_of.day()) < (birthdate.month(), birthdate.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

pub fn age(birthdate: Option<NaiveDate>, as_of: NaiveDate) -> Option<u32> {
    birthdate.map(|b| age_in_years(b, as_of))
}

/// Age as shown in tables and summaries; `-` when the birthdate is unknown.
pub fn age_display(birthdate: Option<NaiveDate>, as_of: NaiveDate) -> String {
    match age(birthdate, as_of) {
        Some(years) => years.to_string(),
        None => EMPTY_DISPLAY.to_string(),
    }
}

/// Days elapsed since the injury. An injury dated after `as_of` is day 0.
pub fn injury_day(date_of_injury: Option<NaiveDate>, as_of: NaiveDate) -> Option<i64> {
    date_of_injury.map(|d| (as_of - d).num_days().max(0))
}

/// Formats an injury date and time, e.g. `Fri, 12 Jul 2024, 14:30`.
///
/// A time without a date is not shown.
pub fn format_injury_datetime(date: Option<NaiveDate>, time: Option<NaiveTime>) -> String {
    match (date, time) {
        (Some(d), Some(t)) => format!("{}, {}", d.format("%a, %d %b %Y"), t.format("%H:%M")),
        (Some(d), None) => d.format("%a, %d %b %Y").to_string(),
        (None, _) => EMPTY_DISPLAY.to_string(),
    }
}

/// Label for a patient in the wizard's searchable option list.
///
/// `First Last (RegNo) - birthdate - sex`; the registration number and birthdate parts
/// are left out when absent.
pub fn patient_option_label(patient: &Patient) -> String {
    let mut label = patient.full_name();
    if let Some(reg) = &patient.hospital_registration_number {
        let _ = write!(label, " ({reg})");
    }
    if let Some(birthdate) = patient.birthdate {
        let _ = write!(label, " - {}", birthdate.format("%Y-%m-%d"));
    }
    let _ = write!(label, " - {}", patient.sex);
    label
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => EMPTY_DISPLAY,
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| EMPTY_DISPLAY.to_string())
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|| EMPTY_DISPLAY.to_string())
}

/// Plain-text summary of an admission for pasting into a chat.
pub fn admission_summary(patient: &Patient, admission: &Admission, as_of: NaiveDate) -> String {
    let c = &admission.clinical;
    let surgery_done = match c.plan.surgery_done {
        Some(true) => "Yes",
        Some(false) => "No",
        None => EMPTY_DISPLAY,
    };

    let mut out = String::new();
    let _ = writeln!(out, "*Patient Information:*");
    let _ = writeln!(out, "Name: {}", patient.full_name());
    let _ = writeln!(out, "Sex: {}", patient.sex);
    let _ = writeln!(out, "Age: {}", age_display(patient.birthdate, as_of));
    let _ = writeln!(out, "Birthdate: {}", opt(patient.birthdate));
    let _ = writeln!(out, "Patient ID: {}", patient.id);
    let _ = writeln!(
        out,
        "Hospital Reg. #: {}",
        or_dash(patient.hospital_registration_number.as_deref())
    );
    let _ = writeln!(out, "Blood Type: {}", opt(patient.blood_type));
    let _ = writeln!(out);

    let _ = writeln!(out, "*Admission Details:*");
    let _ = writeln!(out, "Admission ID: {}", admission.id);
    let _ = writeln!(out, "Status: {}", admission.status);
    let _ = writeln!(out, "Severity: {}", opt(c.severity.as_ref()));
    let _ = writeln!(out, "Created: {}", timestamp(admission.created_at));
    let _ = writeln!(out);

    let _ = writeln!(out, "*Injury & Admission:*");
    let _ = writeln!(out, "Chief Complaint: {}", or_dash(Some(c.injury.chief_complaint.as_str())));
    let _ = writeln!(out, "Nature of Injury: {}", or_dash(c.injury.nature_of_injury.as_deref()));
    let _ = writeln!(
        out,
        "Date/Time of Injury: {}",
        format_injury_datetime(c.injury.date_of_injury, c.injury.time_of_injury)
    );
    let _ = writeln!(out, "Injury Day: {}", opt(injury_day(c.injury.date_of_injury, as_of)));
    let _ = writeln!(out, "Place of Injury: {}", or_dash(c.injury.place_of_injury.as_deref()));
    let _ = writeln!(out);

    let h = &c.history;
    let _ = writeln!(out, "*History:*");
    let _ = writeln!(
        out,
        "History of Present Illness: {}",
        or_dash(h.history_of_present_illness.as_deref())
    );
    let _ = writeln!(out, "Past Medical History: {}", or_dash(h.past_medical_history.as_deref()));
    let _ = writeln!(
        out,
        "Personal Social History: {}",
        or_dash(h.personal_social_history.as_deref())
    );
    let _ = writeln!(
        out,
        "Obstetric/Gynecologic History: {}",
        or_dash(h.obstetric_gynecologic_history.as_deref())
    );
    let _ = writeln!(out);

    let v = &c.vitals;
    let _ = writeln!(out, "*Vitals:*");
    let _ = writeln!(out, "Blood Pressure: {}", or_dash(v.blood_pressure.as_deref()));
    let _ = writeln!(out, "HR: {}", opt(v.hr));
    let _ = writeln!(out, "RR: {}", opt(v.rr));
    let _ = writeln!(out, "SpO2: {}", opt(v.spo2));
    let _ = writeln!(out, "Temperature: {}", opt(v.temperature));
    let _ = writeln!(out);

    let e = &c.examination;
    let _ = writeln!(out, "*Exam & Labs:*");
    let _ = writeln!(out, "Physical Examination: {}", or_dash(e.physical_examination.as_deref()));
    let _ = writeln!(out, "Imaging Findings: {}", or_dash(e.imaging_findings.as_deref()));
    let _ = writeln!(out, "Laboratory: {}", or_dash(e.laboratory.as_deref()));
    let _ = writeln!(out);

    let p = &c.plan;
    let _ = writeln!(out, "*Diagnosis & Plan:*");
    let _ = writeln!(out, "Diagnosis: {}", or_dash(p.diagnosis.as_deref()));
    let _ = writeln!(out, "Initial Management: {}", or_dash(p.initial_management.as_deref()));
    let _ = writeln!(out, "Surgical Plan: {}", or_dash(p.surgical_plan.as_deref()));
    let _ = writeln!(out, "Surgery Done: {surgery_done}");
    let _ = writeln!(out, "Surgery Date: {}", opt(p.surgery_done_at));
    let _ = writeln!(out, "Remarks: {}", or_dash(p.remarks.as_deref()));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::ClinicalRecord;
    use crate::patient::Sex;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn patient() -> Patient {
        Patient {
            id: "p-1".into(),
            first_name: "Ana".into(),
            last_name: "Reyes".into(),
            birthdate: Some(date(1990, 7, 13)),
            sex: Sex::Female,
            hospital_registration_number: Some("HRN-42".into()),
            blood_type: None,
            profile_picture: None,
            created_at: None,
        }
    }

    #[test]
    fn age_counts_completed_years() {
        let today = date(2024, 7, 12);
        assert_eq!(age_in_years(today, today), 0);
        assert_eq!(age_in_years(date(2023, 7, 11), today), 1);
        assert_eq!(age_in_years(date(2023, 7, 13), today), 0);
        assert_eq!(age_in_years(date(1990, 7, 13), today), 33);
        assert_eq!(age_in_years(date(2025, 1, 1), today), 0);
    }

    #[test]
    fn age_display_uses_dash_for_unknown_birthdate() {
        let today = date(2024, 7, 12);
        assert_eq!(age_display(None, today), "-");
        assert_eq!(age_display(Some(today), today), "0");
    }

    #[test]
    fn injury_day_counts_whole_days_and_clamps_future() {
        let today = date(2024, 7, 12);
        assert_eq!(injury_day(None, today), None);
        assert_eq!(injury_day(Some(today), today), Some(0));
        assert_eq!(injury_day(Some(date(2024, 7, 9)), today), Some(3));
        assert_eq!(injury_day(Some(date(2024, 7, 20)), today), Some(0));
    }

    #[test]
    fn injury_datetime_composition() {
        let d = Some(date(2024, 7, 12));
        let t = NaiveTime::from_hms_opt(14, 30, 0);
        assert_eq!(format_injury_datetime(d, t), "Fri, 12 Jul 2024, 14:30");
        assert_eq!(format_injury_datetime(d, None), "Fri, 12 Jul 2024");
        assert_eq!(format_injury_datetime(None, t), "-");
        assert_eq!(format_injury_datetime(None, None), "-");
    }

    #[test]
    fn option_label_omits_absent_parts() {
        let mut p = patient();
        assert_eq!(patient_option_label(&p), "Ana Reyes (HRN-42) - 1990-07-13 - Female");

        p.hospital_registration_number = None;
        p.birthdate = None;
        assert_eq!(patient_option_label(&p), "Ana Reyes - Female");
    }

    #[test]
    fn summary_renders_dash_for_empty_values() {
        let admission = Admission {
            id: "a-1".into(),
            patient_id: "p-1".into(),
            clinical: ClinicalRecord {
                injury: crate::admission::InjuryDetails {
                    chief_complaint: "Stab wound".into(),
                    ..Default::default()
                },
                ..Default::default()
            },
            status: Default::default(),
            created_at: None,
            patient: None,
        };
        let text = admission_summary(&patient(), &admission, date(2024, 7, 12));

        assert!(text.starts_with("*Patient Information:*\nName: Ana Reyes\n"));
        assert!(text.contains("Age: 33\n"));
        assert!(text.contains("Status: ADMITTED\n"));
        assert!(text.contains("Chief Complaint: Stab wound\n"));
        assert!(text.contains("Nature of Injury: -\n"));
        assert!(text.contains("Date/Time of Injury: -\n"));
        assert!(text.contains("HR: -\n"));
        assert!(text.contains("Surgery Done: -\n"));
    }
}
