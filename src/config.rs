use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::providers::Provider;

pub const CONFIG_FILE: &str = "rxchat.toml";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub system_extra: Option<String>,
    pub defaults: Option<Defaults>,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Defaults {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
    pub proxy_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerEntry {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A named tool server and how to launch it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// The `{"mcpServers": {...}}` layout used by desktop MCP hosts.
#[derive(Debug, Deserialize)]
struct McpServersFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: BTreeMap<String, ServerEntry>,
}

const TEMPLATE: &str = r#"# Extra instructions appended to the system prompt.
#system_extra = ""

[defaults]
#provider = "anthropic"
#model = "claude-sonnet-4-5"
#max_tokens = 2048
#base_url = ""
#proxy_timeout_secs = 60

# Tool servers, launched over stdio when a session starts.
# Without any [servers.*] table, the built-in RxNorm proxy is used.
[servers.rxnorm]
command = "rxchat"
args = ["proxy"]
#env = { RXNORM_BASE_URL = "https://rxnav.nlm.nih.gov/REST" }
"#;

impl Config {
    /// Loads `rxchat.toml` from `dir`, if present.
    pub fn load(dir: &Path) -> Result<Option<Config>> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Config> {
        let contents = xx::file::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            let file: McpServersFile = serde_json::from_str(&contents)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
            return Ok(Config {
                servers: file.mcp_servers,
                ..Config::default()
            });
        }
        toml::from_str(&contents).map_err(|e| {
            let span = e.span().map(|s| s.into()).unwrap_or((0, 0).into());
            Error::Toml {
                message: e.message().to_string(),
                src: miette::NamedSource::new(path.display().to_string(), contents.clone()),
                span,
            }
        })
    }

    /// Configured servers, or the built-in RxNorm proxy run from this
    /// executable when none are configured.
    pub fn server_configs(&self) -> Result<Vec<ServerConfig>> {
        if self.servers.is_empty() {
            let exe = std::env::current_exe()?;
            return Ok(vec![ServerConfig {
                name: "rxnorm".into(),
                command: exe.display().to_string(),
                args: vec!["proxy".into()],
                env: BTreeMap::new(),
            }]);
        }
        Ok(self
            .servers
            .iter()
            .map(|(name, entry)| ServerConfig {
                name: name.clone(),
                command: entry.command.clone(),
                args: entry.args.clone(),
                env: entry.env.clone(),
            })
            .collect())
    }

    pub fn template() -> &'static str {
        TEMPLATE
    }
}

/// Writes the config template into `dir`.
pub fn init(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    xx::file::write(&path, Config::template())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
system_extra = "Answer briefly."

[defaults]
provider = "openai"
model = "gpt-4o"
max_tokens = 512
proxy_timeout_secs = 5

[servers.rxnorm]
command = "python"
args = ["tools/rxnorm_server.py"]
env = { RXNORM_BASE_URL = "http://localhost:9000" }
"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.system_extra.as_deref(), Some("Answer briefly."));
        let defaults = config.defaults.clone().unwrap();
        assert_eq!(defaults.provider, Some(Provider::OpenAI));
        assert_eq!(defaults.model.as_deref(), Some("gpt-4o"));
        assert_eq!(defaults.max_tokens, Some(512));
        assert_eq!(defaults.proxy_timeout_secs, Some(5));

        let servers = config.server_configs().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "rxnorm");
        assert_eq!(servers[0].command, "python");
        assert_eq!(servers[0].args, ["tools/rxnorm_server.py"]);
        assert_eq!(servers[0].env["RXNORM_BASE_URL"], "http://localhost:9000");
    }

    #[test]
    fn test_load_mcp_servers_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server_config.json");
        std::fs::write(
            &path,
            r#"{"mcpServers": {"rxnorm": {"command": "uv", "args": ["run", "rxnorm_server.py"]}}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let servers = config.server_configs().unwrap();
        assert_eq!(servers[0].command, "uv");
        assert_eq!(servers[0].args, ["run", "rxnorm_server.py"]);
    }

    #[test]
    fn test_invalid_toml_has_span() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[defaults]\nmax_tokens = \"lots\"\n").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Toml { .. }));
    }

    #[test]
    fn test_default_server_is_builtin_proxy() {
        let servers = Config::default().server_configs().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "rxnorm");
        assert_eq!(servers[0].args, ["proxy"]);
    }

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(Config::template()).unwrap();
        assert!(config.servers.contains_key("rxnorm"));
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path(), false).unwrap();
        assert!(init(dir.path(), false).is_err());
        assert!(init(dir.path(), true).is_ok());
    }
}
