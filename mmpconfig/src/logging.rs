//! Initialisation du système de logging à partir de la configuration
//!
//! Le niveau minimum vient de `host.logger.min_level`, la variable
//! `RUST_LOG` reste prioritaire lorsqu'elle est définie.

use crate::Config;
use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Construit le filtre de niveau à partir de la configuration
pub fn env_filter(config: &Config) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = config.get_log_min_level()?;
    Ok(EnvFilter::try_new(level.to_lowercase())?)
}

/// Installe le subscriber global (filtre + sortie console optionnelle)
///
/// Échoue si un subscriber global est déjà installé.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = env_filter(config)?;
    let console = config.get_log_enable_console()?.then(|| {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_accepts_configured_level() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        config.set_log_min_level("DEBUG".to_string()).unwrap();
        assert!(env_filter(&config).is_ok());
    }
}
