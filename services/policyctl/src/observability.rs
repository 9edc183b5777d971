//! Logging setup for `policyctl`.
//!
//! Logs go to stderr so stdout stays parseable. Initialization is guarded by
//! `OnceLock` to keep repeated calls in tests harmless.
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static OBS_INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_observability(default_filter: &str) {
    OBS_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
