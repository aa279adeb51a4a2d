//! Patient records and the registration form.
//!
//! [`Patient`] is a row as read back from the store. [`PatientDraft`] is the form as typed by
//! the operator (every field a string); validating it yields [`PatientFields`], the columns
//! written on insert and update.

use crate::error::ValidationError;
use crate::wire;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trauma_types::{optional_text, NonEmptyText};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
        }
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Sex::ALL
            .into_iter()
            .find(|sex| sex.as_str().eq_ignore_ascii_case(s))
            .ok_or(ValidationError::MissingSex)
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sex {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown sex '{s}'")))
    }
}

/// ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloodType {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
        BloodType::OPositive,
        BloodType::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
        }
    }
}

impl FromStr for BloodType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        BloodType::ALL
            .into_iter()
            .find(|bt| bt.as_str().eq_ignore_ascii_case(s))
            .ok_or(ValidationError::InvalidBloodType)
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BloodType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A patient row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "wire::optional_date")]
    pub birthdate: Option<NaiveDate>,
    pub sex: Sex,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub hospital_registration_number: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub blood_type: Option<BloodType>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Whether the calling form insists on a birthdate.
///
/// The registry form allows it to be left blank; some quick-add forms require it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BirthdatePolicy {
    #[default]
    Optional,
    Required,
}

/// The patient form as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientDraft {
    pub first_name: String,
    pub last_name: String,
    pub birthdate: String,
    pub sex: String,
    pub hospital_registration_number: String,
    pub blood_type: String,
}

impl PatientDraft {
    /// Prefills the edit form from a stored patient.
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            birthdate: patient
                .birthdate
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            sex: patient.sex.as_str().to_string(),
            hospital_registration_number: patient
                .hospital_registration_number
                .clone()
                .unwrap_or_default(),
            blood_type: patient
                .blood_type
                .map(|b| b.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    /// Checks the form and returns the columns to write.
    ///
    /// Rules run in a fixed order and the first failure is returned.
    pub fn validate(
        &self,
        policy: BirthdatePolicy,
        today: NaiveDate,
    ) -> Result<PatientFields, ValidationError> {
        let first_name =
            NonEmptyText::new(&self.first_name).map_err(|_| ValidationError::MissingFirstName)?;
        let last_name =
            NonEmptyText::new(&self.last_name).map_err(|_| ValidationError::MissingLastName)?;
        let sex: Sex = self.sex.parse()?;

        let birthdate = match optional_text(&self.birthdate) {
            None if policy == BirthdatePolicy::Required => {
                return Err(ValidationError::MissingBirthdate)
            }
            None => None,
            Some(raw) => {
                let date = wire::parse_date(&raw).ok_or(ValidationError::InvalidBirthdate)?;
                if date > today {
                    return Err(ValidationError::FutureBirthdate);
                }
                Some(date)
            }
        };

        let blood_type = optional_text(&self.blood_type)
            .map(|raw| raw.parse::<BloodType>())
            .transpose()?;

        Ok(PatientFields {
            first_name,
            last_name,
            birthdate,
            sex,
            hospital_registration_number: optional_text(&self.hospital_registration_number),
            blood_type,
        })
    }
}

/// Validated patient columns, written on insert and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientFields {
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub birthdate: Option<NaiveDate>,
    pub sex: Sex,
    pub hospital_registration_number: Option<String>,
    pub blood_type: Option<BloodType>,
}

/// A patient insert: optional client-generated id, the fields, and an optional picture path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientInsert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: PatientFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}
