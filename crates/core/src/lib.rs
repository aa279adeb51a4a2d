//! # Trauma One Core
//!
//! Admission record management for the Trauma One front desk.
//!
//! This crate holds the rules applied to patients and admissions before anything reaches
//! the backing store:
//! - Domain model with lenient reading of stored rows
//! - Form validation (single blocking message, fixed rule order)
//! - Derived display values (age, injury day, date/time, option labels, chat summary)
//! - The admission lifecycle
//! - The search/filter/pagination query composer
//! - The admission wizard with inline patient quick add
//! - Session context and latest-request-wins fencing
//!
//! **No transport concerns**: the store is reached through the traits in [`repositories`].
//! The HTTP client lives in `trauma-baas`, the REST facade in `api-rest`.

pub mod admission;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod fencing;
pub mod lifecycle;
pub mod patient;
pub mod query;
pub mod repositories;
pub mod session;
pub mod validation;
pub mod wizard;

mod wire;

pub use admission::{
    Admission, AdmissionDraft, AdmissionStatus, ClinicalRecord, NewAdmission, Severity,
};
pub use config::{BackendKind, BaasEndpoint, CoreConfig, EnvValues};
pub use error::{TraumaError, TraumaResult, ValidationError};
pub use patient::{BirthdatePolicy, BloodType, Patient, PatientDraft, PatientFields, Sex};
pub use query::{AdmissionFilter, Page, PageRequest};
pub use repositories::admissions::AdmissionService;
pub use repositories::patients::{PatientService, ProfilePicture};
pub use repositories::{AdmissionRepository, AuthProvider, Backend, ObjectStorage, PatientRepository};
pub use session::{Session, SessionContext, SessionUser};

pub use trauma_types::{NonEmptyText, TextError};
