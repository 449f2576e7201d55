use anyhow::{Context, Result};
use shroud_daemon::{ApiServer, AppState, ShroudConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

pub async fn run_server(config: ShroudConfig, pid_file: Option<PathBuf>) -> Result<()> {
    info!("Starting shroud v{}", env!("CARGO_PKG_VERSION"));

    if let Some(ref pid_path) = pid_file {
        std::fs::write(pid_path, std::process::id().to_string())
            .with_context(|| format!("Failed to write PID file {:?}", pid_path))?;
        info!("PID file written: {:?}", pid_path);
    }

    config.log_security_warnings();

    let signer = config.security.signer();
    info!("Signing key fingerprint: {}", signer.key_fingerprint());

    let state = AppState::from_config(&config, signer).context("Failed to initialise proxy")?;
    let server = ApiServer::new(
        config.socket_addr(),
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let result = server.serve(wait_for_shutdown()).await;

    if let Some(ref pid_path) = pid_file {
        let _ = std::fs::remove_file(pid_path);
    }

    result.context("Proxy server failed")?;
    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => { info!("Received SIGTERM"); }
                    _ = sigint.recv() => { info!("Received SIGINT"); }
                }
                return;
            }
            _ => warn!("Failed to install signal handlers, falling back to Ctrl+C"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
