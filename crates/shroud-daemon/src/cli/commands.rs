use clap::{Parser, Subcommand};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "shroud")]
#[command(version = BUILD_VERSION)]
#[command(about = "Shroud - Sanitizing page proxy with signed links")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", env = "SHROUD_CONFIG", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the proxy server")]
    Run {
        #[arg(long, value_name = "FILE", help = "Write PID to file")]
        pid_file: Option<PathBuf>,
    },

    #[command(about = "Sign a URL and print its proxied forms")]
    Sign {
        #[arg(help = "Absolute http(s) URL")]
        url: String,
        #[arg(long, value_name = "ORIGIN", help = "Prefix links with this origin (e.g. http://127.0.0.1:8430)")]
        base: Option<String>,
    },

    #[command(about = "Fetch and rewrite a page, printing the result")]
    Rewrite {
        #[arg(help = "Absolute http(s) URL")]
        url: String,
        #[arg(short, long, value_name = "FILE", help = "Write HTML to file instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, help = "Print the rewrite report as JSON")]
        json: bool,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    #[command(about = "Show version information")]
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show effective configuration (secret redacted)")]
    Show,
    #[command(about = "Validate configuration")]
    Validate,
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(short, long, help = "Overwrite existing configuration")]
        force: bool,
    },
}
