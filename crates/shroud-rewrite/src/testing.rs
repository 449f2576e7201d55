use crate::fetch::{Fetch, Fetched};
use crate::links::LinkBuilder;
use async_trait::async_trait;
use shroud_crypto::LinkSigner;
use shroud_types::{Endpoints, ShroudError, ShroudResult, SigningKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

pub fn test_signer() -> LinkSigner {
    LinkSigner::new(SigningKey::from_bytes([7u8; 32]))
}

pub fn test_links() -> LinkBuilder {
    LinkBuilder::new(test_signer(), Endpoints::default())
}

/// In-memory fetcher keyed by absolute URL.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, (String, String)>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, content_type: &str, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), (content_type.to_string(), body.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &Url) -> ShroudResult<Fetched> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url.as_str()) {
            Some((content_type, body)) => Ok(Fetched {
                url: url.clone(),
                status: 200,
                content_type: Some(content_type.clone()),
                body: body.clone().into_bytes(),
            }),
            None => Err(ShroudError::UpstreamStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}
