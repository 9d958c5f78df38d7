use std::future::Future;
use std::pin::Pin;

use log::{debug, info, warn};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;

use super::protocol;
use crate::conversation::ToolDescriptor;
use crate::error::{Error, Result};

/// The tools a server exposes. `call` returns `None` for a name the handler
/// does not know.
pub trait ToolHandler: Send + Sync + 'static {
    fn server_name(&self) -> &str;

    fn definitions(&self) -> Vec<ToolDescriptor>;

    fn call<'a>(
        &'a self,
        name: &'a str,
        arguments: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Option<Result<Value>>> + Send + 'a>>;
}

/// Exposes a [`ToolHandler`] as an MCP server.
pub struct ToolService<H> {
    handler: H,
}

impl<H: ToolHandler> ToolService<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Serves MCP on this process's stdin/stdout until the client hangs up.
    pub async fn serve_stdio(self) -> Result<()> {
        let name = self.handler.server_name().to_string();
        info!("{name}: serving MCP on stdio");
        let running = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| Error::ProxyUnavailable(format!("{name}: handshake failed: {e}")))?;
        let reason = running
            .waiting()
            .await
            .map_err(|e| Error::ProxyUnavailable(format!("{name}: server task failed: {e}")))?;
        info!("{name}: stopped ({reason:?})");
        Ok(())
    }
}

impl<H: ToolHandler> ServerHandler for ToolService<H> {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info = Implementation {
            name: self.handler.server_name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Implementation::from_build_env()
        };
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        let tools = self
            .handler
            .definitions()
            .iter()
            .map(protocol::tool)
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let name = request.name.as_ref();
        let arguments = Value::Object(request.arguments.clone().unwrap_or_default());
        debug!("tools/call {name}");
        match self.handler.call(name, &arguments).await {
            None => Err(ErrorData::invalid_params(
                format!("unknown tool: {name}"),
                None,
            )),
            Some(Ok(value)) => Ok(protocol::success(&value)),
            Some(Err(e)) => {
                warn!("{name} failed: {e}");
                Ok(protocol::failure(e))
            }
        }
    }
}
