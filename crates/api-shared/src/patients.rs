use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    /// `YYYY-MM-DD`.
    pub birthdate: Option<String>,
    /// Whole years as of today, or `-` without a birthdate.
    pub age: String,
    pub sex: String,
    pub hospital_registration_number: Option<String>,
    pub blood_type: Option<String>,
    /// Storage path of the picture; fetch a URL from `/patients/{id}/picture-url`.
    pub profile_picture: Option<String>,
    /// Searchable option label used by the admission form.
    pub label: String,
    pub created_at: Option<String>,
}

/// The patient form. Blank optional fields are stored as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PatientFormReq {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`, or blank.
    pub birthdate: String,
    /// `Male`, `Female` or `Other`.
    pub sex: String,
    pub hospital_registration_number: String,
    pub blood_type: String,
    /// Reject the form when no birthdate is given.
    pub require_birthdate: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPatientsQuery {
    /// Matches first name, last name or hospital registration number.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PictureUploadQuery {
    /// File extension of the uploaded image, such as `png` or `jpg`.
    pub ext: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PictureUrlRes {
    /// Time-limited URL, or `null` when the patient has no picture.
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_form_fills_missing_fields() {
        let form: PatientFormReq =
            serde_json::from_str(r#"{"first_name":"Ana","last_name":"Reyes","sex":"Female"}"#)
                .unwrap();
        assert_eq!(form.birthdate, "");
        assert_eq!(form.blood_type, "");
        assert!(!form.require_birthdate);
    }
}
