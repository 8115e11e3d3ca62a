//! Tracing subscriber setup shared by both binaries
//!
//! `CARTERA_LOG` takes an `EnvFilter` directive (e.g. `cartera=debug`).
//! Without it the caller's default applies. Output goes to stderr so CLI
//! stdout stays clean for CSV and JSON.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CARTERA_LOG";

/// Filter used by the CLI when `CARTERA_LOG` is unset
pub const CLI_DEFAULT_FILTER: &str = "warn";

/// Filter used by the server when `CARTERA_LOG` is unset
pub const SERVER_DEFAULT_FILTER: &str = "cartera=info,cartera_server=info,tower_http=info";

/// Resolve the active filter directive
pub fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
