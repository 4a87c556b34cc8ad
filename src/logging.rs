//! Tracing subscriber setup.
//!
//! Logs go to **stderr** so a host driving the provider over stdout never sees
//! them interleaved with its own output. Filtering follows `RUST_LOG`.
//!
//! ```bash
//! # Default: info
//! ./my-host
//!
//! # Trace every API request the client sends
//! RUST_LOG=unikraft_cloud_provider::platform=debug ./my-host
//!
//! # Include the raw event-stream lines
//! RUST_LOG=warn,unikraft_cloud_provider::sse=trace ./my-host
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber, defaulting to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LOG_LEVEL);
}

/// Like [`init_logging`], with a custom level used when `RUST_LOG` is unset.
///
/// ```ignore
/// unikraft_cloud_provider::init_logging_with_default("debug");
/// tracing::debug!("provider starting");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to install the global subscriber.
///
/// Returns `false` instead of panicking when one is already set, which makes
/// it safe to call from every test.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LOG_LEVEL))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can be set once per process, so only the filter
    // parsing is exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_LEVEL).is_ok());
        assert!(EnvFilter::try_new("unikraft_cloud_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,unikraft_cloud_provider::sse=trace").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
