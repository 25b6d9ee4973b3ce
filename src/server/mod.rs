//! Read-only HTTP content server
//!
//! Serves resolved (content, mimetype) pairs by key. The server holds
//! read-only store handles injected at startup and exposes no mutating
//! routes; all writes go through the CLI and the patch engine.

mod config;
mod routes;
mod server;

pub use config::ServerConfig;
pub use routes::{content_routes, ContentState};
pub use server::ContentServer;
