use anyhow::{anyhow, Result};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Initialize tracing with the given default level.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_tracing(level: Level) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing: {}", e))?;

    info!("initialized tracing with level: {}", level);

    Ok(())
}
