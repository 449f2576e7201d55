use super::commands::Cli;
use anyhow::{Context, Result};
use shroud_daemon::config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn filter_directive(cli: &Cli, logging: &LoggingConfig) -> String {
    if cli.quiet {
        return "warn".to_string();
    }
    match cli.verbose {
        0 => logging.level.to_string(),
        1 => "info,shroud_daemon=debug,shroud_rewrite=debug".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// `RUST_LOG` wins over flags and config. Console output goes to stderr so
/// `shroud rewrite` can print HTML on stdout.
pub fn init_logging(cli: &Cli, logging: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(cli, logging)));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match cli.log_file.as_ref().or(logging.file.as_ref()) {
        Some(log_file) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .with_context(|| format!("Failed to open log file {:?}", log_file))?;
            let writer = std::sync::Mutex::new(file);
            if logging.json {
                subscriber.with(fmt::layer().json().with_writer(writer)).try_init()?;
            } else {
                subscriber
                    .with(fmt::layer().with_writer(writer).with_ansi(false))
                    .try_init()?;
            }
        }
        None => {
            if logging.json {
                subscriber
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .try_init()?;
            } else {
                subscriber
                    .with(fmt::layer().with_writer(std::io::stderr).with_target(cli.verbose >= 2))
                    .try_init()?;
            }
        }
    }
    Ok(())
}

pub fn show_version() {
    println!("shroud {}", env!("CARGO_PKG_VERSION"));
    println!("  signing: keyed BLAKE3 ({})", shroud_crypto::LINK_SIGNING_CONTEXT);
    println!("  user agent: {}", shroud_types::DEFAULT_USER_AGENT);
}
