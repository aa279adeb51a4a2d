//! # API Shared
//!
//! Request and response bodies of the Trauma One REST facade.
//!
//! Contains:
//! - JSON DTOs for sessions, patients and admissions, with OpenAPI schemas
//! - `HealthService`
//! - Bearer token parsing for the route guard
//!
//! The DTOs carry plain strings and numbers only; conversion from the domain model lives in
//! `api-rest`.

pub mod admissions;
pub mod auth;
pub mod error;
pub mod health;
pub mod patients;
pub mod session;

pub use admissions::{
    AdmissionFormReq, AdmissionRes, AdmissionSummaryRes, ListAdmissionsQuery, ListAdmissionsRes,
};
pub use error::ErrorRes;
pub use health::{HealthRes, HealthService};
pub use patients::{
    ListPatientsQuery, ListPatientsRes, PatientFormReq, PatientRes, PictureUploadQuery,
    PictureUrlRes,
};
pub use session::{LoginReq, SessionRes};
