mod app;
mod bridge;
mod cli;
mod config;
mod conversation;
mod error;
mod llm;
mod mcp;
mod prompt;
mod providers;
mod rxnorm;
mod ui;

#[cfg(test)]
mod test_helpers;

use clap::Parser;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> miette::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Chat { llm } => app::chat(cli.config, llm).await,
        Command::Serve { llm, port, host } => app::serve(cli.config, llm, port, host).await,
        Command::Proxy { base_url } => {
            rxnorm::tools::run_stdio(&base_url).await?;
            Ok(())
        }
        Command::Tools => app::tools(cli.config).await,
        Command::Init { force } => app::init(force),
    }
}
