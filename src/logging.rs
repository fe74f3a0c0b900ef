//! Console logging through tracing-subscriber

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Settings for the console subscriber
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// filter used when RUST_LOG is not set, e.g. "info" or "covid_monthly=debug"
    pub level: String,
    pub include_targets: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            include_targets: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn verbose(verbose: bool) -> Self {
        let level = if verbose { "debug" } else { "info" };
        Self {
            level: level.to_string(),
            ..Default::default()
        }
    }

    /// RUST_LOG wins over `level`, an invalid filter falls back to info
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber; fails if one is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let layer = fmt::layer()
        .with_target(config.include_targets)
        .with_ansi(config.ansi)
        .without_time();
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(layer)
        .try_init()?;
    Ok(())
}
