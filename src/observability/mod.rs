use tracing_subscriber::EnvFilter;

use crate::routing::Route;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let Some(filter) = filter_for_level(log_level) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn filter_for_level(log_level: &str) -> Option<EnvFilter> {
    let level = log_level.to_uppercase();
    let tracing_level = match level.as_str() {
        "DISABLED" => return None,
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };
    Some(EnvFilter::try_new(tracing_level).unwrap_or_else(|_| EnvFilter::new("INFO")))
}

/// Log one finished request with its route, final status and latency.
pub fn log_request_complete(route: Route, status: http::StatusCode, start_time: std::time::Instant) {
    tracing::info!(
        route = route.as_str(),
        status = status.as_u16(),
        elapsed_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
        "request complete"
    );
}
