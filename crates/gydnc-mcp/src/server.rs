//! MCP server implementation for gydnc.

use std::borrow::Cow;
use std::sync::Arc;

use gydnc_core::AppContext;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData, ServerHandler};
use serde_json::json;

use crate::error::{McpError, McpResult};
use crate::tools;

/// MCP server exposing guidance entities over stdio.
#[derive(Clone)]
pub struct GydncServer {
    ctx: Arc<AppContext>,
}

impl GydncServer {
    /// Create a server over an application context.
    #[must_use]
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Serve the MCP protocol over stdio until the peer disconnects.
    pub async fn serve_stdio(&self) -> McpResult<()> {
        tracing::info!("gydnc MCP server starting");

        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();

        let service = rmcp::serve_server(self.clone(), (stdin, stdout))
            .await
            .map_err(|e| {
                tracing::error!("server initialization error: {}", e);
                McpError::Protocol(e.to_string())
            })?;

        service.waiting().await.map_err(|e| {
            tracing::error!("server runtime error: {}", e);
            McpError::Protocol(e.to_string())
        })?;

        tracing::info!("gydnc MCP server stopped");
        Ok(())
    }
}

fn object_schema(value: serde_json::Value) -> Arc<JsonObject> {
    match value {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

fn read_tool() -> Tool {
    Tool::new(
        Cow::Borrowed("read"),
        Cow::Borrowed(
            "Read guidance entities: list them (optionally filtered by a tag expression) \
             or fetch one or more by alias.",
        ),
        object_schema(json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["list", "get"],
                    "description": "Read operation to perform"
                },
                "filterTags": {
                    "type": "string",
                    "description": "Tag filter for list, e.g. 'scope:* -deprecated'"
                },
                "prefix": {
                    "type": "string",
                    "description": "Alias prefix restriction for list"
                },
                "aliases": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Aliases to fetch for get"
                }
            },
            "required": ["operation"]
        })),
    )
}

fn write_tool() -> Tool {
    Tool::new(
        Cow::Borrowed("write"),
        Cow::Borrowed(
            "Write guidance entities: create a new entity (alias must be unique) or \
             update an existing one, leaving omitted fields unchanged.",
        ),
        object_schema(json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["create", "update"],
                    "description": "Write operation to perform"
                },
                "alias": {
                    "type": "string",
                    "description": "Hierarchical entity alias, e.g. 'recipes/git/commit-creation'"
                },
                "title": {"type": "string"},
                "description": {"type": "string"},
                "tags": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Full replacement tag set"
                },
                "body": {"type": "string", "description": "Markdown body"},
                "backend": {
                    "type": "string",
                    "description": "Explicit target backend name"
                }
            },
            "required": ["operation", "alias"]
        })),
    )
}

fn to_error_data(error: &McpError) -> ErrorData {
    let data = error
        .kind()
        .map(|kind| json!({ "kind": kind }));
    let message = error.to_string();
    match error.error_code() {
        -32602 => ErrorData::invalid_params(message, data),
        -32700 => ErrorData::parse_error(message, data),
        -32600 => ErrorData::invalid_request(message, data),
        _ => ErrorData::internal_error(message, data),
    }
}

fn to_result<T: serde::Serialize>(output: &T) -> Result<CallToolResult, ErrorData> {
    let payload = serde_json::to_string(output)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(payload)]))
}

impl ServerHandler for GydncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "gydnc-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Fetch and maintain guidance entities. Use the read tool to list or get \
                 guidance, and the write tool to create or update it."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: vec![read_tool(), write_tool()],
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = serde_json::Value::Object(request.arguments.unwrap_or_default());

        match request.name.as_ref() {
            "read" => {
                let params: tools::ReadParams = serde_json::from_value(arguments)
                    .map_err(|e| ErrorData::invalid_params(e.to_string(), None))?;
                let output =
                    tools::handle_read(&self.ctx, params).map_err(|e| to_error_data(&e))?;
                to_result(&output)
            },
            "write" => {
                let params: tools::WriteParams = serde_json::from_value(arguments)
                    .map_err(|e| ErrorData::invalid_params(e.to_string(), None))?;
                let output =
                    tools::handle_write(&self.ctx, params).map_err(|e| to_error_data(&e))?;
                to_result(&output)
            },
            other => Err(ErrorData::invalid_params(
                format!("unknown tool '{other}'"),
                None,
            )),
        }
    }
}
