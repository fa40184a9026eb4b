//! Logging setup and spans
//!
//! Library code only emits `tracing` events; binaries call
//! [`init_logging`] once at startup to install a subscriber.

use std::str::FromStr;
use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use optimist_core::HandleId;

static INIT: Once = Once::new();

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines, for machines
    Json,
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// Single-line output
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` controls levels (default `info`). Later calls are no-ops.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);

        // A test harness may already own the global subscriber
        let installed = match format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        };
        if let Err(e) = installed {
            tracing::debug!(error = %e, "global subscriber already installed, keeping it");
        }
    });
}

/// Span wrapping the handling of one settlement
#[must_use]
pub fn settlement_span(handle: HandleId) -> Span {
    tracing::debug_span!("settlement", handle = %handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LogFormat::Compact);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn test_init_logging_with_existing_subscriber() {
        // Whichever install wins, the other must back off quietly
        let _ = tracing_subscriber::registry().try_init();
        init_logging(LogFormat::Pretty);
        tracing::info!("still logging");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_settlement_span_enters() {
        let span = settlement_span(HandleId::mint());
        let _guard = span.enter();
        tracing::debug!("inside settlement span");
    }
}
