//! Tracing subscriber setup for the binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
    #[error("Failed to init subscriber: {0}")]
    Init(String),
}

/// Install a global fmt subscriber. `RUST_LOG` wins over `fallback_filter`.
/// With `json` set, events are written as one JSON object per line.
pub fn init_tracing(fallback_filter: &str, json: bool) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(fallback_filter)?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::debug!(filter = fallback_filter, json, "Tracing initialized");
    Ok(())
}

fn parse_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_accepts_directives() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("rutastic_client=debug,reqwest=warn").is_ok());
    }

    #[test]
    fn test_parse_filter_rejects_garbage() {
        let err = parse_filter("rutastic_client=loud").expect_err("unknown level");
        assert!(matches!(err, TelemetryError::InvalidFilter { ref filter, .. } if filter == "rutastic_client=loud"));
    }
}
