use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde_json::Value;

use super::ToolServer;
use super::client::McpClient;
use crate::config::ServerConfig;
use crate::conversation::ToolDescriptor;
use crate::error::{Error, Result};

/// Tools offered to the model, and which server answers each one.
#[derive(Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    routes: HashMap<String, Arc<dyn ToolServer>>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Spawns every configured server and collects its tools. Servers that
    /// fail are skipped; if none can be reached the whole load fails.
    pub async fn load(servers: &[ServerConfig], timeout: Duration) -> Result<Self> {
        let mut registry = Self::empty();
        let mut failures = Vec::new();
        for config in servers {
            info!("connecting to tool server {}", config.name);
            let connected = match McpClient::spawn(config, timeout).await {
                Ok(client) => registry.register(Arc::new(client)).await,
                Err(e) => Err(e),
            };
            if let Err(e) = connected {
                warn!("tool server {} unavailable: {e}", config.name);
                failures.push(e.to_string());
            }
        }
        if !servers.is_empty() && failures.len() == servers.len() {
            return Err(Error::ProxyUnavailable(failures.join("; ")));
        }
        info!(
            "tool registry ready: {} tools",
            registry.descriptors.len()
        );
        Ok(registry)
    }

    /// Adds a server's tools. A name already owned by another server is
    /// rejected and the first registration kept.
    pub async fn register(&mut self, server: Arc<dyn ToolServer>) -> Result<()> {
        let tools = server.list_tools().await?;
        for tool in tools {
            if let Some(owner) = self.routes.get(&tool.name) {
                warn!(
                    "tool {} from {} already provided by {}, skipping",
                    tool.name,
                    server.name(),
                    owner.name()
                );
                continue;
            }
            self.routes.insert(tool.name.clone(), Arc::clone(&server));
            self.descriptors.push(tool);
        }
        Ok(())
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Runs `name` on the server that owns it. One attempt, no retries.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let server = self
            .routes
            .get(name)
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))?;
        server.call_tool(name, arguments).await
    }
}
