//! Logging and observability
//!
//! Structured logging through `tracing`, with a console layer and an
//! optional rotating JSON file layer, plus a few macros for the log lines
//! every export emits.
//!
//! # Example
//!
//! ```no_run
//! use quarry::logging::init_logging;
//! use quarry::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of an export phase
///
/// # Example
///
/// ```no_run
/// use quarry::log_phase_start;
///
/// log_phase_start!("structure", "Dumping structure...");
/// ```
#[macro_export]
macro_rules! log_phase_start {
    ($phase:expr, $message:expr) => {
        tracing::info!(phase = $phase, "{}", $message);
    };
}

/// Log the successful end of an export phase
///
/// # Example
///
/// ```no_run
/// use quarry::log_phase_complete;
/// use std::time::Duration;
///
/// log_phase_complete!("routines", "Routines dumped.", Duration::from_millis(120));
/// ```
#[macro_export]
macro_rules! log_phase_complete {
    ($phase:expr, $message:expr, $duration:expr) => {
        tracing::info!(
            phase = $phase,
            duration_ms = $duration.as_millis() as u64,
            "{}",
            $message
        );
    };
}

/// Log a table's `[completed/total]` progress line
///
/// # Example
///
/// ```no_run
/// use quarry::log_table_progress;
///
/// log_table_progress!(3, 12, "album", true);
/// ```
#[macro_export]
macro_rules! log_table_progress {
    ($completed:expr, $total:expr, $table:expr, $succeeded:expr) => {
        if $succeeded {
            tracing::info!(
                table = %$table,
                completed = $completed,
                total = $total,
                "[{}/{}] Table \"{}\" dumped.",
                $completed,
                $total,
                $table
            );
        } else {
            tracing::warn!(
                table = %$table,
                completed = $completed,
                total = $total,
                "[{}/{}] Table \"{}\" failed.",
                $completed,
                $total,
                $table
            );
        }
    };
}
