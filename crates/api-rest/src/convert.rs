//! Domain model to DTO mapping, and form DTOs back to drafts.

use api_shared::{
    AdmissionFormReq, AdmissionRes, ListAdmissionsQuery, PatientFormReq, PatientRes, SessionRes,
};
use chrono::NaiveDate;
use trauma_core::display::{
    age_display, format_injury_datetime, injury_day, patient_option_label,
};
use trauma_core::{
    Admission, AdmissionDraft, AdmissionFilter, AdmissionStatus, BirthdatePolicy, Patient,
    PatientDraft, Session, TraumaError, TraumaResult,
};

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

pub(crate) fn patient_res(patient: &Patient, today: NaiveDate) -> PatientRes {
    PatientRes {
        id: patient.id.clone(),
        first_name: patient.first_name.clone(),
        last_name: patient.last_name.clone(),
        full_name: patient.full_name(),
        birthdate: date_text(patient.birthdate),
        age: age_display(patient.birthdate, today),
        sex: patient.sex.to_string(),
        hospital_registration_number: patient.hospital_registration_number.clone(),
        blood_type: patient.blood_type.map(|b| b.to_string()),
        profile_picture: patient.profile_picture.clone(),
        label: patient_option_label(patient),
        created_at: patient.created_at.map(|t| t.to_rfc3339()),
    }
}

pub(crate) fn admission_res(admission: &Admission, today: NaiveDate) -> AdmissionRes {
    let c = admission.clinical.clone();
    AdmissionRes {
        id: admission.id.clone(),
        patient_id: admission.patient_id.clone(),
        patient: admission.patient.as_ref().map(|p| patient_res(p, today)),
        status: admission.status.to_string(),
        severity: c.severity.map(|s| s.to_string()),

        injury_datetime: format_injury_datetime(
            c.injury.date_of_injury,
            c.injury.time_of_injury,
        ),
        injury_day: injury_day(c.injury.date_of_injury, today),
        chief_complaint: c.injury.chief_complaint,
        nature_of_injury: c.injury.nature_of_injury,
        date_of_injury: date_text(c.injury.date_of_injury),
        time_of_injury: c
            .injury
            .time_of_injury
            .map(|t| t.format("%H:%M").to_string()),
        place_of_injury: c.injury.place_of_injury,

        history_of_present_illness: c.history.history_of_present_illness,
        past_medical_history: c.history.past_medical_history,
        personal_social_history: c.history.personal_social_history,
        obstetric_gynecologic_history: c.history.obstetric_gynecologic_history,

        blood_pressure: c.vitals.blood_pressure,
        hr: c.vitals.hr,
        rr: c.vitals.rr,
        spo2: c.vitals.spo2,
        temperature: c.vitals.temperature,

        physical_examination: c.examination.physical_examination,
        imaging_findings: c.examination.imaging_findings,
        laboratory: c.examination.laboratory,

        diagnosis: c.plan.diagnosis,
        initial_management: c.plan.initial_management,
        surgical_plan: c.plan.surgical_plan,
        surgery_done: c.plan.surgery_done,
        surgery_done_at: date_text(c.plan.surgery_done_at),
        remarks: c.plan.remarks,

        created_at: admission.created_at.map(|t| t.to_rfc3339()),
    }
}

pub(crate) fn session_res(session: &Session) -> SessionRes {
    SessionRes {
        access_token: session.access_token.clone(),
        refresh_token: session.refresh_token.clone(),
        expires_at: session.expires_at.map(|t| t.to_rfc3339()),
        user_id: session.user.as_ref().map(|u| u.id.clone()),
        email: session.user.as_ref().and_then(|u| u.email.clone()),
    }
}

pub(crate) fn patient_draft(form: PatientFormReq) -> (PatientDraft, BirthdatePolicy) {
    let policy = if form.require_birthdate {
        BirthdatePolicy::Required
    } else {
        BirthdatePolicy::Optional
    };
    let draft = PatientDraft {
        first_name: form.first_name,
        last_name: form.last_name,
        birthdate: form.birthdate,
        sex: form.sex,
        hospital_registration_number: form.hospital_registration_number,
        blood_type: form.blood_type,
    };
    (draft, policy)
}

pub(crate) fn admission_draft(form: AdmissionFormReq) -> AdmissionDraft {
    AdmissionDraft {
        patient_id: form.patient_id,
        chief_complaint: form.chief_complaint,
        nature_of_injury: form.nature_of_injury,
        date_of_injury: form.date_of_injury,
        time_of_injury: form.time_of_injury,
        place_of_injury: form.place_of_injury,
        history_of_present_illness: form.history_of_present_illness,
        past_medical_history: form.past_medical_history,
        personal_social_history: form.personal_social_history,
        obstetric_gynecologic_history: form.obstetric_gynecologic_history,
        blood_pressure: form.blood_pressure,
        hr: form.hr,
        rr: form.rr,
        spo2: form.spo2,
        temperature: form.temperature,
        physical_examination: form.physical_examination,
        imaging_findings: form.imaging_findings,
        laboratory: form.laboratory,
        diagnosis: form.diagnosis,
        initial_management: form.initial_management,
        surgical_plan: form.surgical_plan,
        surgery_done: form.surgery_done,
        surgery_done_at: form.surgery_done_at,
        remarks: form.remarks,
        severity: form.severity,
    }
}

/// Reads the list filters. A blank value, or `ALL` for status, means no filter.
pub(crate) fn admission_filter(query: &ListAdmissionsQuery) -> TraumaResult<AdmissionFilter> {
    let date_of_injury = match non_blank(query.date_of_injury.as_deref()) {
        None => None,
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            TraumaError::InvalidInput(format!("date_of_injury '{raw}' is not YYYY-MM-DD"))
        })?),
    };

    let status = match non_blank(query.status.as_deref()) {
        None => None,
        Some(raw) if raw.eq_ignore_ascii_case("all") => None,
        Some(raw) => Some(
            raw.parse::<AdmissionStatus>()
                .map_err(TraumaError::InvalidInput)?,
        ),
    };

    Ok(AdmissionFilter {
        free_text: non_blank(query.search.as_deref()).map(str::to_string),
        date_of_injury,
        status,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
