use anyhow::{Context, Result};
use shroud_daemon::ShroudConfig;
use shroud_rewrite::{LinkBuilder, ProxyHandler, RemoteFetcher};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn rewrite_page(
    config: &ShroudConfig,
    url: &str,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let fetcher = Arc::new(RemoteFetcher::new(config.fetch.options())?);
    let links = LinkBuilder::new(config.security.signer(), config.rewrite.endpoints());
    let handler = ProxyHandler::new(fetcher, links, config.rewrite.sanitize_options());

    let Some(page) = handler
        .handle(Some(url))
        .await
        .with_context(|| format!("Failed to rewrite {}", url))?
    else {
        eprintln!("Nothing to rewrite");
        return Ok(());
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &page.html)
                .with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("Wrote {} bytes to {:?}", page.html.len(), path);
        }
        None => println!("{}", page.html),
    }

    if json {
        eprintln!("{}", serde_json::to_string_pretty(&page.report)?);
    } else {
        eprintln!("Report: {}", page.report);
    }
    Ok(())
}
