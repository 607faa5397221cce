//! Shared foundation for the watchtower workspace: configuration, the
//! project/report domain types, the remote collaborator contracts and the
//! short-lived project structure cache.

pub mod config;
pub mod remote;
pub mod report_cache;
pub mod types;
