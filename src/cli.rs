use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::providers::Provider;
use crate::rxnorm;

#[derive(Parser, Debug)]
#[command(
    name = "rxchat",
    version,
    about = "Drug information chatbot backed by RxNorm"
)]
pub struct Cli {
    /// Config file (rxchat.toml, or a .json file in mcpServers format)
    #[arg(long, global = true, env = "RXCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LlmArgs {
    /// LLM provider: anthropic, openai (auto-detected from model name)
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Model to use
    #[arg(long)]
    pub model: Option<String>,

    /// Max response tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Base URL for the LLM API
    #[arg(long, env = "LLM_BASE_URL")]
    pub base_url: Option<String>,

    /// Seconds to wait for a tool server response
    #[arg(long)]
    pub proxy_timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chat in the terminal
    Chat {
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Serve the chat UI over HTTP
    Serve {
        #[command(flatten)]
        llm: LlmArgs,

        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,

        /// Address to bind (0.0.0.0 when PORT is set, else 127.0.0.1)
        #[arg(long)]
        host: Option<IpAddr>,
    },

    /// Run the RxNorm tool server over stdin/stdout
    Proxy {
        /// RxNorm REST base URL
        #[arg(long, env = "RXNORM_BASE_URL", default_value = rxnorm::DEFAULT_BASE_URL)]
        base_url: String,
    },

    /// List the tools offered by the configured servers
    Tools,

    /// Generate an rxchat.toml config file in the current directory
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}
