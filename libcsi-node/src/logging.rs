//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence; otherwise the configured [`LogLevel`] sets
//! the global filter.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;
use crate::error::CsiError;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_tracing_level().to_string()))
}

/// Install the global subscriber.  Later calls are no-ops.
pub fn init(level: LogLevel, format: LogFormat) -> Result<(), CsiError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter_for(level));
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(CsiError::internal)
}
