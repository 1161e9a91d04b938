//! Tracing and logging setup shared by every process.

/// Initialize process-wide logging with JSON output.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::Json);
}

pub use self::tracing::LogFormat;

/// Tracing configuration (filters, formatters).
pub mod tracing;
