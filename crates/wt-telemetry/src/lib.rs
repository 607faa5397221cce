//! Logging setup shared by the watchtower binaries and tests.
//!
//! Everything else in the workspace only depends on `tracing`; this crate is
//! the single place that installs a `tracing-subscriber` global subscriber.

pub mod logging;
