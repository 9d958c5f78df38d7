use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use console::style;
use log::{info, warn};

use crate::bridge::TurnBridge;
use crate::cli::LlmArgs;
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::llm::CompletionClient;
use crate::mcp::ToolRegistry;
use crate::prompt;
use crate::providers::{self, Provider};
use crate::ui::terminal::Spinner;
use crate::ui::{self, ChatSession};

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 60;

/// Process-wide pieces shared by every chat session.
pub struct App {
    llm: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
    system: String,
}

impl App {
    pub fn new(llm: Arc<dyn CompletionClient>, registry: Arc<ToolRegistry>, system: String) -> Self {
        Self {
            llm,
            registry,
            system,
        }
    }

    /// Loads config, connects the tool servers and builds the LLM client.
    pub async fn build(config_path: Option<&Path>, args: &LlmArgs) -> Result<Self> {
        let config = load_config(config_path)?;
        let defaults = config.defaults.clone().unwrap_or_default();

        let timeout = Duration::from_secs(
            args.proxy_timeout
                .or(defaults.proxy_timeout_secs)
                .unwrap_or(DEFAULT_PROXY_TIMEOUT_SECS),
        );
        let registry = match ToolRegistry::load(&config.server_configs()?, timeout).await {
            Ok(registry) => registry,
            Err(e @ Error::ProxyUnavailable(_)) => {
                warn!("{e}; continuing without tools");
                ToolRegistry::empty()
            }
            Err(e) => return Err(e),
        };

        let model = args
            .model
            .clone()
            .or(defaults.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.into());
        let max_tokens = args
            .max_tokens
            .or(defaults.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let provider: Provider = args
            .provider
            .clone()
            .or(defaults.provider.clone())
            .unwrap_or_else(|| providers::detect_provider(&model));
        info!("provider: {provider}, model: {model}");

        let api_key = providers::api_key_from_env(&provider);
        if api_key.is_empty() {
            warn!("no API key found for {provider}");
        }
        let base_url = args
            .base_url
            .clone()
            .or(defaults.base_url.clone())
            .filter(|u| !u.is_empty());
        let llm: Arc<dyn CompletionClient> = Arc::from(providers::build_client(
            &provider, api_key, model, max_tokens, base_url,
        ));

        let system = prompt::system_prompt(config.system_extra.as_deref(), registry.descriptors());
        Ok(Self::new(llm, Arc::new(registry), system))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn bridge(&self) -> TurnBridge {
        TurnBridge::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.registry),
            self.system.clone(),
        )
    }

    pub fn new_session(&self) -> ChatSession {
        ChatSession::new(self.bridge())
    }
}

/// `--config` if given, else `./rxchat.toml`, else built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Some(Config::load_from(path)?),
        None => Config::load(&std::env::current_dir()?)?,
    };
    Ok(config.unwrap_or_default())
}

pub async fn chat(config_path: Option<PathBuf>, args: LlmArgs) -> miette::Result<()> {
    let app = App::build(config_path.as_deref(), &args).await?;
    let mut bridge = app.bridge();
    bridge.set_observer(Arc::new(Spinner::default()));
    ui::terminal::run(ChatSession::new(bridge), app.registry.len()).await?;
    Ok(())
}

pub async fn serve(
    config_path: Option<PathBuf>,
    args: LlmArgs,
    port: u16,
    host: Option<IpAddr>,
) -> miette::Result<()> {
    let host = host.unwrap_or_else(|| {
        if std::env::var_os("PORT").is_some() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    });
    let app = App::build(config_path.as_deref(), &args).await?;
    ui::web::serve(Arc::new(app), SocketAddr::new(host, port)).await?;
    Ok(())
}

pub async fn tools(config_path: Option<PathBuf>) -> miette::Result<()> {
    let config = load_config(config_path.as_deref())?;
    let timeout = Duration::from_secs(
        config
            .defaults
            .as_ref()
            .and_then(|d| d.proxy_timeout_secs)
            .unwrap_or(DEFAULT_PROXY_TIMEOUT_SECS),
    );
    let registry = ToolRegistry::load(&config.server_configs()?, timeout).await?;
    if registry.is_empty() {
        println!("No tools available");
    }
    for tool in registry.descriptors() {
        println!("{}  {}", style(&tool.name).bold(), style(&tool.description).dim());
    }
    Ok(())
}

pub fn init(force: bool) -> miette::Result<()> {
    let dir = std::env::current_dir().map_err(Error::from)?;
    let path = config::init(&dir, force)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
