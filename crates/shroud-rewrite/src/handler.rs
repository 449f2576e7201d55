use crate::fetch::Fetch;
use crate::html::{DomRewriter, RewrittenPage, SanitizeOptions};
use crate::links::LinkBuilder;
use shroud_types::{ShroudError, ShroudResult};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Composition root for one proxied page: parse the target, fetch it once,
/// sanitize and rewrite it.
pub struct ProxyHandler {
    fetcher: Arc<dyn Fetch>,
    rewriter: DomRewriter,
}

impl ProxyHandler {
    pub fn new(fetcher: Arc<dyn Fetch>, links: LinkBuilder, options: SanitizeOptions) -> Self {
        let rewriter = DomRewriter::new(links, options, fetcher.clone());
        Self { fetcher, rewriter }
    }

    pub fn links(&self) -> &LinkBuilder {
        self.rewriter.links()
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetch> {
        &self.fetcher
    }

    /// Returns `Ok(None)` when no target was supplied.
    pub async fn handle(&self, target: Option<&str>) -> ShroudResult<Option<RewrittenPage>> {
        let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("Empty proxy target, nothing to do");
            return Ok(None);
        };

        let url = Url::parse(target).map_err(|e| ShroudError::InvalidUrl(format!("{}: {}", target, e)))?;
        let document = self.fetcher.fetch(&url).await?;

        if !document.is_html() {
            return Err(ShroudError::Parse(format!(
                "{} is not an HTML document ({})",
                document.url,
                document.content_type.as_deref().unwrap_or("unknown type")
            )));
        }

        // redirects move the base context to wherever the document actually lives
        let page = self.rewriter.process(&document.url, &document.text()).await?;
        info!("Rewrote {} ({})", document.url, page.report);
        Ok(Some(page))
    }
}
