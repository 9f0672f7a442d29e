//! Tracing initialization

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the subscriber with an env-filter; `RUST_LOG` overrides the
/// default level.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ikona=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::debug!("telemetry initialized");
    Ok(())
}
