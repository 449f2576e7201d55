use anyhow::{bail, Context, Result};
use shroud_daemon::ShroudConfig;
use shroud_rewrite::LinkBuilder;
use shroud_types::RewriteTarget;
use url::Url;

pub fn sign_url(config: &ShroudConfig, raw: &str, base: Option<&str>) -> Result<()> {
    if !config.security.has_secret() {
        bail!("No signing secret configured; a token from an ephemeral key would never verify. Set SHROUD_SIGNING_SECRET.");
    }

    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Only http and https URLs can be proxied");
    }

    let links = LinkBuilder::new(config.security.signer(), config.rewrite.endpoints());
    let origin = base.map(|b| b.trim_end_matches('/')).unwrap_or("");

    println!("URL:   {}", url);
    println!("Token: {}", links.signer().sign(url.as_str()));
    println!("Page:  {}{}", origin, links.build(RewriteTarget::PageLink, &url));
    println!("Image: {}{}", origin, links.build(RewriteTarget::Image, &url));
    Ok(())
}
