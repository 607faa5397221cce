pub mod client;
pub mod contents;
pub mod issues;
