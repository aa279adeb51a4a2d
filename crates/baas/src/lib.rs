//! # Trauma One BaaS client
//!
//! Implements the `trauma-core` repository, auth and storage traits against a hosted
//! backend-as-a-service over HTTP:
//! - rows: `/rest/v1/{table}` in the PostgREST query dialect
//! - auth: `/auth/v1/*` password sessions
//! - storage: `/storage/v1/object/*` uploads and signed URLs
//!
//! Each session gets its own [`BaasClient`] carrying that session's access token.

pub mod auth;
pub mod client;
mod postgrest;
pub mod rows;
pub mod storage;

pub use auth::BaasAuth;
pub use client::BaasClient;
pub use rows::BaasRows;
pub use storage::BaasStorage;

use std::sync::Arc;
use trauma_core::repositories::memory::MemoryBackend;
use trauma_core::{
    AdmissionRepository, AuthProvider, Backend, BackendKind, BaasEndpoint, CoreConfig,
    ObjectStorage, PatientRepository, Session, TraumaError, TraumaResult,
};

/// The hosted backend.
pub struct BaasBackend {
    client: BaasClient,
}

impl BaasBackend {
    pub fn new(endpoint: &BaasEndpoint) -> TraumaResult<Self> {
        Ok(Self {
            client: BaasClient::new(endpoint)?,
        })
    }
}

impl Backend for BaasBackend {
    fn auth(&self) -> Arc<dyn AuthProvider> {
        Arc::new(BaasAuth::new(self.client.clone()))
    }

    fn patients(&self, session: &Session) -> Arc<dyn PatientRepository> {
        Arc::new(BaasRows::new(self.client.with_session(session)))
    }

    fn admissions(&self, session: &Session) -> Arc<dyn AdmissionRepository> {
        Arc::new(BaasRows::new(self.client.with_session(session)))
    }

    fn storage(&self, session: &Session) -> Arc<dyn ObjectStorage> {
        Arc::new(BaasStorage::new(self.client.with_session(session)))
    }
}

/// Builds the backend selected by `cfg`.
///
/// `memory_user` is an `(email, password)` pair registered with the in-memory backend so
/// that something can sign in; it is ignored for the hosted backend.
pub fn backend_for(
    cfg: &CoreConfig,
    memory_user: Option<(&str, &str)>,
) -> TraumaResult<Arc<dyn Backend>> {
    match cfg.backend() {
        BackendKind::Baas => {
            let endpoint = cfg.baas().ok_or_else(|| {
                TraumaError::InvalidInput("no BaaS endpoint configured".into())
            })?;
            tracing::info!(url = endpoint.url(), "using hosted backend");
            Ok(Arc::new(BaasBackend::new(endpoint)?))
        }
        BackendKind::Memory => {
            tracing::info!("using in-memory backend");
            let backend = match memory_user {
                Some((email, password)) => MemoryBackend::new().with_user(email, password),
                None => MemoryBackend::new(),
            };
            Ok(Arc::new(backend))
        }
    }
}
