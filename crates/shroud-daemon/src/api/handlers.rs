use super::responses::{page_response, resource_response, ApiError, HealthResponse};
use super::state::AppState;
use axum::extract::{Query, State};
use axum::http::Uri;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use shroud_types::{RewriteReport, ShroudError, ShroudResult, IMAGE_SIGNATURE_MARKER};
use tracing::debug;
use url::Url;

#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
    /// Accepted as an alias of `url`.
    pub u: Option<String>,
    pub key: Option<String>,
}

impl ProxyQuery {
    pub fn target(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.u.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        key_fingerprint: state.signer().key_fingerprint(),
        require_signature: state.require_signature(),
    })
}

pub async fn proxy_page(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Result<Response, ApiError> {
    let Some(target) = query.target() else {
        debug!("Proxy request without target");
        return Ok(page_response(String::new(), &RewriteReport::default()));
    };

    state.authorize(target, query.key.as_deref())?;

    let page = state.handler().handle(Some(target)).await?;
    Ok(match page {
        Some(page) => page_response(page.html, &page.report),
        None => page_response(String::new(), &RewriteReport::default()),
    })
}

pub async fn relay_resource(State(state): State<AppState>, uri: Uri) -> Result<Response, ApiError> {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| uri.path());
    let prefix = &state.handler().links().endpoints().image_path;
    let (token, target) = split_resource_path(path, prefix)?;

    state.authorize(target, Some(token))?;

    let url = Url::parse(target).map_err(|e| ShroudError::InvalidUrl(format!("{}: {}", target, e)))?;
    let fetched = state.handler().fetcher().fetch(&url).await?;
    debug!("Relaying {} ({} bytes)", fetched.url, fetched.body.len());

    Ok(resource_response(fetched.content_type.as_deref(), fetched.body))
}

/// Splits `<prefix>,s<token>/<absoluteURL>` into token and URL. The URL keeps
/// its own query string.
pub fn split_resource_path<'a>(path: &'a str, prefix: &str) -> ShroudResult<(&'a str, &'a str)> {
    let rest = path
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(IMAGE_SIGNATURE_MARKER))
        .ok_or_else(|| ShroudError::InvalidUrl("resource path carries no signature".into()))?;

    match rest.split_once('/') {
        Some((token, target)) if !token.is_empty() && !target.is_empty() => Ok((token, target)),
        _ => Err(ShroudError::InvalidUrl("malformed resource path".into())),
    }
}
