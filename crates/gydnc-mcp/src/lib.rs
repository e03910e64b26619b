//! gydnc MCP server
//!
//! A Rust-native MCP (Model Context Protocol) server exposing gydnc
//! guidance entities to AI agents as two tools: `read` (list/get) and
//! `write` (create/update).

pub mod error;
pub mod server;
pub mod tools;

use std::sync::Arc;

use gydnc_core::AppContext;

pub use error::{McpError, McpResult};
pub use server::GydncServer;

/// Main entry point for the MCP server.
///
/// Resolves the store configuration (via `GYDNC_CONFIG`), then serves the
/// MCP protocol over stdio.
///
/// # Errors
///
/// Returns an error if configuration resolution fails or the server fails
/// to initialize or run.
pub async fn serve_stdio() -> McpResult<()> {
    // Logs go to stderr; stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("initializing gydnc MCP server");

    let ctx = Arc::new(AppContext::load(None)?);
    let server = GydncServer::new(ctx);
    server.serve_stdio().await
}
