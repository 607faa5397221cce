//! Watchtower daemon: periodic project scans, a chat front-end and the
//! HTTP API that exposes both.
//!
//! - [`detector`]: rule-based issue detection over a structure snapshot
//! - [`scanner`]: scan orchestration and the periodic scan loop
//! - [`chat`]: slash commands and AI-backed conversation turns
//! - [`http_api`]: `axum` router over the queue, scanner and chat
//! - [`daemon`]: wiring and graceful shutdown

pub mod chat;
pub mod daemon;
pub mod detector;
pub mod http_api;
pub mod scanner;
