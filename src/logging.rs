use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Result, ServeError};

/// Install a stdout subscriber. `RUST_LOG` overrides `level`.
pub fn init(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| ServeError::Config(format!("Failed to initialize logging: {e}")))?;

    Ok(())
}
