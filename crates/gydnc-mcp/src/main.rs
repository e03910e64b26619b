//! Binary entry point for the gydnc MCP server.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    gydnc_mcp::serve_stdio().await?;
    Ok(())
}
