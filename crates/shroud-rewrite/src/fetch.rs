use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use shroud_types::{
    ShroudError, ShroudResult, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT,
};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use tracing::debug;
use url::{Host, Url};

#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub max_redirects: usize,
    pub user_agent: String,
    pub block_private_networks: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            block_private_networks: true,
        }
    }
}

/// A successfully retrieved remote resource.
#[derive(Clone, Debug)]
pub struct Fetched {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn mime(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
    }

    /// Missing content types are treated as HTML.
    pub fn is_html(&self) -> bool {
        match self.mime() {
            None => true,
            Some(m) => m == "text/html" || m == "application/xhtml+xml",
        }
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> ShroudResult<Fetched>;
}

pub fn is_private_destination(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_private_v4(ip),
        Some(Host::Ipv6(ip)) => is_private_v6(ip),
        None => true,
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.octets()[0] == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

fn check_destination(url: &Url, block_private: bool) -> ShroudResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ShroudError::InvalidUrl(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            url
        )));
    }
    if block_private && is_private_destination(url) {
        return Err(ShroudError::Blocked(url.host_str().unwrap_or("").to_string()));
    }
    Ok(())
}

/// Anonymous GET client used for every outbound retrieval.
///
/// Nothing about the caller is forwarded: no cookies, no referer, no client
/// headers, a fixed user agent. Private destinations are refused up front
/// and on every redirect hop.
#[derive(Clone)]
pub struct RemoteFetcher {
    client: Client,
    options: FetchOptions,
}

impl RemoteFetcher {
    pub fn new(options: FetchOptions) -> ShroudResult<Self> {
        Self::with_builder(options, Client::builder())
    }

    fn with_builder(options: FetchOptions, builder: ClientBuilder) -> ShroudResult<Self> {
        let max_redirects = options.max_redirects;
        let block_private = options.block_private_networks;
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                attempt.error(format!("more than {} redirects", max_redirects))
            } else if block_private && is_private_destination(attempt.url()) {
                let message = format!("redirect to private destination {}", attempt.url());
                attempt.error(message)
            } else {
                attempt.follow()
            }
        });

        let client = builder
            .timeout(options.timeout)
            .redirect(policy)
            .referer(false)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| ShroudError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }
}

#[async_trait]
impl Fetch for RemoteFetcher {
    async fn fetch(&self, url: &Url) -> ShroudResult<Fetched> {
        check_destination(url, self.options.block_private_networks)?;
        debug!("HTTP GET: {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html,text/css,image/*;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| ShroudError::Fetch(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShroudError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let limit = self.options.max_body_bytes;
        if response.content_length().map_or(false, |len| len > limit as u64) {
            return Err(ShroudError::TooLarge(format!("{} exceeds {} bytes", url, limit)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ShroudError::Fetch(format!("Reading {} failed: {}", url, e)))?
        {
            if body.len() + chunk.len() > limit {
                return Err(ShroudError::TooLarge(format!("{} exceeds {} bytes", url, limit)));
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} ({} bytes)", final_url, body.len());
        Ok(Fetched {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
