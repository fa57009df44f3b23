//! Tracing setup.
//!
//! Filter resolution order: the `RUST_LOG` environment variable wins;
//! otherwise directives are built from the `[logging]` config section
//! (default level plus per-module overrides). Output lines carry a
//! compact local timestamp via tracing-subscriber's chrono timer.
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "quarry::indexing" = "debug"
//! ```

use crate::config::LoggingConfig;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

static STARTED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Later calls are no-ops, so the CLI
/// and embedding libraries can both call this safely.
pub fn init_with_config(config: &LoggingConfig) {
    STARTED.get_or_init(|| {
        let filter = match std::env::var("RUST_LOG") {
            Ok(_) => EnvFilter::from_default_env(),
            Err(_) => EnvFilter::new(config_directives(config)),
        };
        // try_init: a subscriber installed by the host application is
        // not an error for a library crate.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(ChronoLocal::new("%H:%M:%S%.3f".to_owned()))
            .with_target(true)
            .try_init();
    });
}

/// Quiet default: warnings and errors only. `RUST_LOG` still overrides.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Comma-joined filter directives, e.g. `warn,quarry::indexing=debug`.
fn config_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.default.clone()];
    directives.extend(
        config
            .modules
            .iter()
            .map(|(module, level)| format!("{module}={level}")),
    );
    directives.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_start_with_default_level() {
        let config = LoggingConfig::default();
        assert_eq!(config_directives(&config), "warn");
    }

    #[test]
    fn module_overrides_are_appended() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("quarry::indexing".to_string(), "debug".to_string());
        let directives = config_directives(&config);
        assert!(directives.starts_with("warn"));
        assert!(directives.contains("quarry::indexing=debug"));
    }
}
