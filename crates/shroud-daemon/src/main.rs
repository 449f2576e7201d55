mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{
    handle_config, init_logging, rewrite_page, run_server, show_version, sign_url, Cli, Commands,
};
use shroud_daemon::config::LoggingConfig;
use shroud_daemon::ShroudConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(ShroudConfig::default_path);

    // config subcommands must work on files that do not parse yet
    if let Commands::Config { action } = &cli.command {
        init_logging(&cli, &LoggingConfig::default())?;
        return handle_config(&config_path, action.as_ref());
    }
    if let Commands::Version = cli.command {
        show_version();
        return Ok(());
    }

    let config = ShroudConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    init_logging(&cli, &config.logging)?;

    match cli.command {
        Commands::Run { pid_file } => run_server(config, pid_file).await,
        Commands::Sign { url, base } => sign_url(&config, &url, base.as_deref()),
        Commands::Rewrite { url, output, json } => rewrite_page(&config, &url, output, json).await,
        Commands::Config { .. } | Commands::Version => Ok(()),
    }
}
