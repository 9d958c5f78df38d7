pub mod client;
pub mod protocol;
pub mod registry;
pub mod server;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::conversation::ToolDescriptor;
use crate::error::Result;

pub use registry::ToolRegistry;

/// A connected tool server: something that can advertise tools and run them.
pub trait ToolServer: Send + Sync {
    fn name(&self) -> &str;

    fn list_tools(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ToolDescriptor>>> + Send + '_>>;

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;
}
