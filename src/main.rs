use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use api_shared::HealthService;
use trauma_baas::backend_for;
use trauma_core::config::core_config_from_env_values;
use trauma_core::constants::DEFAULT_REST_ADDR;
use trauma_core::{BackendKind, EnvValues};

const DEFAULT_DEV_EMAIL: &str = "frontdesk@trauma.one";
const DEFAULT_DEV_PASSWORD: &str = "trauma";

/// Main entry point for the Trauma One application
///
/// Resolves configuration once, picks the backing store and serves the REST facade
/// (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `TRAUMA_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRAUMA_BACKEND`: `baas` (default) or `memory`
/// - `TRAUMA_BAAS_URL`, `TRAUMA_BAAS_ANON_KEY`: hosted backend endpoint
/// - `TRAUMA_AVATAR_BUCKET`: bucket for profile pictures (default: "avatar")
/// - `TRAUMA_SIGNED_URL_TTL_SECS`: signed picture URL lifetime (default: 3600)
/// - `TRAUMA_DEV_EMAIL`, `TRAUMA_DEV_PASSWORD`: the account that can sign in to the
///   in-memory backend
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trauma=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(core_config_from_env_values(EnvValues::from_env())?);

    let dev_email =
        std::env::var("TRAUMA_DEV_EMAIL").unwrap_or_else(|_| DEFAULT_DEV_EMAIL.into());
    let dev_password =
        std::env::var("TRAUMA_DEV_PASSWORD").unwrap_or_else(|_| DEFAULT_DEV_PASSWORD.into());
    if cfg.backend() == BackendKind::Memory {
        tracing::warn!(
            "-- In-memory backend: data is lost on exit; sign in as {}",
            dev_email
        );
    }
    let backend = backend_for(&cfg, Some((&dev_email, &dev_password)))?;

    let rest_addr = std::env::var("TRAUMA_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    tracing::info!("++ Starting Trauma One REST on {}", rest_addr);
    tracing::info!("{}", HealthService::check_health().message);

    let app = router(AppState::new(cfg, backend));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
