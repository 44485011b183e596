//! # Profiling
//!
//! With the `profiling` feature enabled, query registration, removal commits,
//! change diffing and pipeline systems each open an `info_span!`. Install a
//! subscriber to collect them:
//!
//! ```ignore
//! let _guard = bitmask_ecs::profiling::init_file_subscriber("traces", "ecs.json")?;
//! // run systems; spans are written as JSON lines until `_guard` drops
//! ```
//!
//! Profile in release mode for representative timings.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

use crate::error::{EcsError, Result};

/// Install a JSON subscriber writing to stdout, filtered by `RUST_LOG`.
pub fn init_json_subscriber() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init()
        .map_err(|e| EcsError::ConfigError(e.to_string()))
}

/// Install a JSON subscriber writing to `dir/file_name` through a background
/// worker. Trace lines are flushed while the returned guard is alive.
pub fn init_file_subscriber(dir: impl AsRef<Path>, file_name: &str) -> Result<WorkerGuard> {
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init()
        .map_err(|e| EcsError::ConfigError(e.to_string()))?;
    Ok(guard)
}
