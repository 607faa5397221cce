use wt_telemetry::logging::{self, LogFormat};

#[test]
fn init_logging_twice_is_a_no_op() {
    logging::init_logging("test-service", "debug");
    logging::init_logging("test-service", "info");

    tracing::info!(key = "value", "human-readable log line");
}

#[test]
fn init_json_after_human_does_not_panic() {
    // Whichever test runs first owns the global subscriber; the rest no-op.
    logging::init(LogFormat::Json, "test-service-json", "info");

    tracing::info!(key = "value", "json log line");
}
