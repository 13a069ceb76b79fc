//! Logging setup
//!
//! Level comes from `RUST_LOG`, defaulting to `info`. Call once per process.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

fn env_filter() -> EnvFilter {
    parse_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

/// Unparseable directives fall back to the default level
fn parse_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
}

/// Human-readable output
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .init();
}

/// One JSON object per event
pub fn init_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_target(true))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_info() {
        assert_eq!(parse_filter(None).to_string().to_lowercase(), "info");
    }

    #[test]
    fn test_filter_keeps_directives() {
        let filter = parse_filter(Some("raiz_runtime=debug"));
        assert!(filter.to_string().to_lowercase().contains("raiz_runtime=debug"));
    }
}
