use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use log::{debug, info};
use rmcp::ServiceError;
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use serde_json::Value;
use tokio::process::Command;

use super::ToolServer;
use super::protocol;
use crate::config::ServerConfig;
use crate::conversation::ToolDescriptor;
use crate::error::{Error, Result};

/// Client side of an MCP connection. The peer multiplexes requests, so one
/// client can serve several chat sessions at once. Dropping the client
/// stops the service and the server process with it.
pub struct McpClient {
    name: String,
    service: RunningService<RoleClient, ()>,
    timeout: Duration,
}

impl McpClient {
    /// Launches the configured server process and performs the handshake.
    pub async fn spawn(config: &ServerConfig, timeout: Duration) -> Result<Self> {
        let mut command = Command::new(&config.command);
        command.args(&config.args).envs(&config.env);

        let transport = TokioChildProcess::new(command).map_err(|e| {
            Error::ProxyUnavailable(format!(
                "failed to spawn {} ({}): {e}",
                config.name, config.command
            ))
        })?;

        let service = tokio::time::timeout(timeout, ().serve(transport))
            .await
            .map_err(|_| {
                Error::ProxyUnavailable(format!(
                    "{}: handshake timed out after {}s",
                    config.name,
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                Error::ProxyUnavailable(format!("{}: handshake failed: {e}", config.name))
            })?;

        Ok(Self::new(&config.name, service, timeout))
    }

    /// Wraps an already-initialized service.
    pub fn new(name: &str, service: RunningService<RoleClient, ()>, timeout: Duration) -> Self {
        match service.peer().peer_info() {
            Some(peer) => info!("{name}: initialized (server {})", peer.server_info.name),
            None => info!("{name}: initialized"),
        }
        Self {
            name: name.to_string(),
            service,
            timeout,
        }
    }

    async fn request<T, F>(&self, method: &str, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ServiceError>>,
    {
        debug!("{}: {method}", self.name);
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(ServiceError::McpError(e))) => Err(Error::Upstream {
                status: None,
                message: format!("JSON-RPC error {}: {}", e.code.0, e.message),
            }),
            Ok(Err(e)) => Err(self.unavailable(&e.to_string())),
            Err(_) => Err(self.unavailable(&format!(
                "{method} timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    fn unavailable(&self, message: &str) -> Error {
        Error::ProxyUnavailable(format!("{}: {message}", self.name))
    }
}

impl ToolServer for McpClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tools(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ToolDescriptor>>> + Send + '_>> {
        Box::pin(async move {
            let tools = self
                .request("tools/list", self.service.peer().list_all_tools())
                .await?;
            Ok(tools.into_iter().map(protocol::descriptor).collect())
        })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(async move {
            let arguments = match arguments {
                Value::Object(map) => Some(map),
                Value::Null => None,
                other => {
                    return Err(Error::Tool(format!(
                        "arguments for {name} must be an object, got {other}"
                    )));
                }
            };
            let result = self
                .request(
                    "tools/call",
                    self.service.peer().call_tool(CallToolRequestParam {
                        name: name.to_string().into(),
                        arguments,
                    }),
                )
                .await?;
            protocol::parse_result(result)
        })
    }
}
