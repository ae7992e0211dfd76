use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{AppError, AppResult};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `filter` when set. Records from the `log` facade
/// (used by the library crates) are bridged into tracing.
pub fn init_logging(filter: &str) -> AppResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter).map_err(|e| AppError::Logging(e.to_string()))?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(false),
        )
        .with(env_filter)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    tracing::debug!("Logging initialized");
    Ok(())
}
