//! Tracing subscriber setup for the binary
//!
//! `RUST_LOG` wins when set; otherwise the configured [`LogLevel`] applies to
//! this crate and to `tower_http`. Output goes to stderr so `dump` and `query`
//! keep stdout clean.

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Filter used when `RUST_LOG` is absent
pub fn default_filter(level: LogLevel) -> String {
    let directive = level.filter_directive();
    format!("warn,racegraph={directive},tower_http={directive}")
}

/// Install the global subscriber; a second call is a no-op
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
