//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services as an
//! `Arc<CoreConfig>`. Request handlers never read process-wide environment variables; the
//! `*_from_env_value` helpers take the raw value so binaries can do the reading.

use crate::constants::{DEFAULT_AVATAR_BUCKET, DEFAULT_SIGNED_URL_TTL_SECS};
use crate::{TraumaError, TraumaResult};
use std::str::FromStr;
use std::time::Duration;

/// Which backing store the process talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// The hosted backend-as-a-service over HTTP.
    Baas,
    /// A process-local store, for development and tests.
    Memory,
}

impl FromStr for BackendKind {
    type Err = TraumaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baas" => Ok(Self::Baas),
            "memory" => Ok(Self::Memory),
            other => Err(TraumaError::InvalidInput(format!(
                "unknown backend '{other}' (expected 'baas' or 'memory')"
            ))),
        }
    }
}

/// Connection details for the hosted backend.
#[derive(Clone, Debug)]
pub struct BaasEndpoint {
    url: String,
    anon_key: String,
}

impl BaasEndpoint {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> TraumaResult<Self> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let anon_key = anon_key.into().trim().to_string();

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(TraumaError::InvalidInput(
                "BaaS URL must start with http:// or https://".into(),
            ));
        }
        if anon_key.is_empty() {
            return Err(TraumaError::InvalidInput(
                "BaaS anon key cannot be empty".into(),
            ));
        }

        Ok(Self { url, anon_key })
    }

    /// Base URL without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    backend: BackendKind,
    baas: Option<BaasEndpoint>,
    avatar_bucket: String,
    signed_url_ttl: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// A `Baas` backend requires an endpoint; a `Memory` backend ignores it.
    pub fn new(
        backend: BackendKind,
        baas: Option<BaasEndpoint>,
        avatar_bucket: String,
        signed_url_ttl: Duration,
    ) -> TraumaResult<Self> {
        if backend == BackendKind::Baas && baas.is_none() {
            return Err(TraumaError::InvalidInput(
                "TRAUMA_BAAS_URL and TRAUMA_BAAS_ANON_KEY are required for the baas backend"
                    .into(),
            ));
        }
        if avatar_bucket.trim().is_empty() {
            return Err(TraumaError::InvalidInput(
                "avatar bucket cannot be empty".into(),
            ));
        }
        if signed_url_ttl.is_zero() {
            return Err(TraumaError::InvalidInput(
                "signed URL lifetime must be positive".into(),
            ));
        }

        Ok(Self {
            backend,
            baas,
            avatar_bucket: avatar_bucket.trim().to_string(),
            signed_url_ttl,
        })
    }

    /// Configuration for the in-memory backend with default bucket and URL lifetime.
    pub fn memory() -> Self {
        Self {
            backend: BackendKind::Memory,
            baas: None,
            avatar_bucket: DEFAULT_AVATAR_BUCKET.to_string(),
            signed_url_ttl: Duration::from_secs(DEFAULT_SIGNED_URL_TTL_SECS),
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn baas(&self) -> Option<&BaasEndpoint> {
        self.baas.as_ref()
    }

    pub fn avatar_bucket(&self) -> &str {
        &self.avatar_bucket
    }

    pub fn signed_url_ttl(&self) -> Duration {
        self.signed_url_ttl
    }
}

/// Parse the backend kind from an optional string value.
///
/// If `value` is `None` or blank, returns [`BackendKind::Baas`].
pub fn backend_kind_from_env_value(value: Option<String>) -> TraumaResult<BackendKind> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => v.parse(),
        None => Ok(BackendKind::Baas),
    }
}

/// Parse the signed URL lifetime (seconds) from an optional string value.
pub fn signed_url_ttl_from_env_value(value: Option<String>) -> TraumaResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let secs = match value {
        Some(v) => v.parse::<u64>().map_err(|_| {
            TraumaError::InvalidInput(format!("signed URL lifetime must be whole seconds, got '{v}'"))
        })?,
        None => DEFAULT_SIGNED_URL_TTL_SECS,
    };

    Ok(Duration::from_secs(secs))
}

/// Build the BaaS endpoint from optional URL and key values.
///
/// Returns `Ok(None)` when neither is set, and an error when only one is.
pub fn baas_endpoint_from_env_values(
    url: Option<String>,
    anon_key: Option<String>,
) -> TraumaResult<Option<BaasEndpoint>> {
    let url = url.filter(|v| !v.trim().is_empty());
    let anon_key = anon_key.filter(|v| !v.trim().is_empty());

    match (url, anon_key) {
        (Some(url), Some(key)) => BaasEndpoint::new(url, key).map(Some),
        (None, None) => Ok(None),
        _ => Err(TraumaError::InvalidInput(
            "TRAUMA_BAAS_URL and TRAUMA_BAAS_ANON_KEY must be set together".into(),
        )),
    }
}

/// Raw configuration values as read from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvValues {
    pub backend: Option<String>,
    pub baas_url: Option<String>,
    pub baas_anon_key: Option<String>,
    pub avatar_bucket: Option<String>,
    pub signed_url_ttl_secs: Option<String>,
}

impl EnvValues {
    /// Reads every `TRAUMA_*` variable the core configuration is built from.
    pub fn from_env() -> Self {
        Self {
            backend: std::env::var("TRAUMA_BACKEND").ok(),
            baas_url: std::env::var("TRAUMA_BAAS_URL").ok(),
            baas_anon_key: std::env::var("TRAUMA_BAAS_ANON_KEY").ok(),
            avatar_bucket: std::env::var("TRAUMA_AVATAR_BUCKET").ok(),
            signed_url_ttl_secs: std::env::var("TRAUMA_SIGNED_URL_TTL_SECS").ok(),
        }
    }
}

/// Resolve the core configuration from raw values, applying defaults.
pub fn core_config_from_env_values(values: EnvValues) -> TraumaResult<CoreConfig> {
    let backend = backend_kind_from_env_value(values.backend)?;
    let baas = baas_endpoint_from_env_values(values.baas_url, values.baas_anon_key)?;
    let avatar_bucket = values
        .avatar_bucket
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AVATAR_BUCKET.to_string());
    let signed_url_ttl = signed_url_ttl_from_env_value(values.signed_url_ttl_secs)?;

    CoreConfig::new(backend, baas, avatar_bucket, signed_url_ttl)
}
