//! Structured logging configuration.
//!
//! Library code logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the binary's own `tracing` events.

use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from the RUST_LOG env var, defaulting to `info`.
///
/// # Example
///
/// ```no_run
/// logging::init();
/// tracing::info!("Server starting");
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Log output goes to stderr; stdout carries the JSON protocol.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a handled console command
///
/// # Arguments
///
/// * `command` - Command name
/// * `table_id` - Table the command was routed to, if any
/// * `elapsed` - Time spent waiting on the table
/// * `ok` - Whether the table accepted it
pub fn log_command(command: &str, table_id: Option<i64>, elapsed: Duration, ok: bool) {
    let duration_ms = elapsed.as_millis() as u64;
    if duration_ms > 1000 {
        tracing::warn!(
            command = command,
            table_id = table_id,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow table reply"
        );
    }
    tracing::debug!(
        command = command,
        table_id = table_id,
        duration_ms = duration_ms,
        ok = ok,
        "Command handled"
    );
}
