//! Constants used throughout the Trauma One core crate.
//!
//! Table names, bucket names and page sizes live here so the BaaS client, the in-memory
//! backend and the query composer agree on them.

/// Row table holding patient records.
pub const PATIENTS_TABLE: &str = "patients";

/// Row table holding admission records.
pub const ADMISSIONS_TABLE: &str = "admissions";

/// Column every list view orders by (descending).
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Patient columns matched by free-text search.
pub const PATIENT_SEARCH_COLUMNS: [&str; 3] =
    ["first_name", "last_name", "hospital_registration_number"];

/// Rows per page on admission list views.
pub const ADMISSIONS_PAGE_SIZE: u32 = 10;

/// Rows per page on patient list views.
pub const PATIENTS_PAGE_SIZE: u32 = 15;

/// Storage bucket for patient profile pictures when none is configured.
pub const DEFAULT_AVATAR_BUCKET: &str = "avatar";

/// Largest profile picture accepted for upload, matching the avatar bucket's file limit.
pub const MAX_PROFILE_PICTURE_BYTES: usize = 10 * 1024 * 1024;

/// Lifetime of a profile picture signed URL when none is configured.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 60 * 60;

/// Address the REST facade binds to when none is configured.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Error code the row store returns once an access token has expired.
pub const SESSION_EXPIRED_CODE: &str = "PGRST301";

/// Placeholder rendered for absent values.
pub const EMPTY_DISPLAY: &str = "-";
