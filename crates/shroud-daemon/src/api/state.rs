use crate::config::ShroudConfig;
use shroud_crypto::LinkSigner;
use shroud_rewrite::{LinkBuilder, ProxyHandler, RemoteFetcher};
use shroud_types::{ShroudError, ShroudResult};
use std::sync::Arc;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    handler: Arc<ProxyHandler>,
    require_signature: bool,
}

impl AppState {
    pub fn new(handler: Arc<ProxyHandler>, require_signature: bool) -> Self {
        Self {
            handler,
            require_signature,
        }
    }

    pub fn from_config(config: &ShroudConfig, signer: LinkSigner) -> ShroudResult<Self> {
        let fetcher = Arc::new(RemoteFetcher::new(config.fetch.options())?);
        let links = LinkBuilder::new(signer, config.rewrite.endpoints());
        let handler = ProxyHandler::new(fetcher, links, config.rewrite.sanitize_options());
        Ok(Self::new(Arc::new(handler), config.server.require_signature))
    }

    pub fn handler(&self) -> &ProxyHandler {
        &self.handler
    }

    pub fn signer(&self) -> &LinkSigner {
        self.handler.links().signer()
    }

    pub fn require_signature(&self) -> bool {
        self.require_signature
    }

    /// Checks that `token` was issued by this process for exactly `url`.
    pub fn authorize(&self, url: &str, token: Option<&str>) -> ShroudResult<()> {
        if !self.require_signature {
            return Ok(());
        }

        match token {
            Some(token) if self.signer().verify(url, token) => Ok(()),
            Some(_) => Err(ShroudError::InvalidSignature(format!("key does not match {}", url))),
            None => Err(ShroudError::InvalidSignature("missing key".into())),
        }
    }
}
