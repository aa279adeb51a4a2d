/// A single blocking form error.
///
/// The `Display` text of each variant is the exact message shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Patient is required.")]
    MissingPatient,
    #[error("Chief complaint is required.")]
    MissingChiefComplaint,
    #[error("Respiratory Rate (RR) must be a positive integer.")]
    InvalidRespiratoryRate,
    #[error("Heart Rate (HR) must be a positive integer.")]
    InvalidHeartRate,
    #[error("SpO2 must be a number between 0 and 100.")]
    InvalidSpo2,
    #[error("Temperature must be a number.")]
    InvalidTemperature,
    #[error("Date of injury must be a valid date.")]
    InvalidInjuryDate,
    #[error("Time of injury must be a valid time.")]
    InvalidInjuryTime,
    #[error("Surgery date must be a valid date.")]
    InvalidSurgeryDate,

    #[error("First name is required.")]
    MissingFirstName,
    #[error("Last name is required.")]
    MissingLastName,
    #[error("Please select a sex.")]
    MissingSex,
    #[error("A birthdate is required.")]
    MissingBirthdate,
    #[error("Birthdate must be a valid date.")]
    InvalidBirthdate,
    #[error("Birthdate cannot be in the future.")]
    FutureBirthdate,
    #[error("Blood type is not recognised.")]
    InvalidBloodType,
}

#[derive(Debug, thiserror::Error)]
pub enum TraumaError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("store error: {message}")]
    Store {
        code: Option<String>,
        message: String,
    },
    #[error("session expired")]
    SessionExpired,
    #[error("not signed in")]
    Unauthenticated,
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TraumaError {
    /// Builds a store error carrying the raw text returned by the backing store.
    pub fn store(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Store {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// The text an operator sees for this failure.
    ///
    /// Store errors surface the store's own message untranslated.
    pub fn user_message(&self) -> String {
        match self {
            Self::Store { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type TraumaResult<T> = std::result::Result<T, TraumaError>;
