use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use shroud_types::{RewriteReport, ShroudError};
use tracing::{debug, warn};

/// Number of references the rewrite pass had to leave alone.
pub const SKIPPED_HEADER: HeaderName = HeaderName::from_static("x-shroud-skipped");

const PAGE_CSP: &str = "script-src 'none'; object-src 'none'; base-uri 'none'; form-action 'none'";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub key_fingerprint: String,
    pub require_signature: bool,
}

pub fn page_response(html: String, report: &RewriteReport) -> Response {
    let mut response = Html(html).into_response();
    let headers = response.headers_mut();
    headers.insert(SKIPPED_HEADER, HeaderValue::from(report.skipped));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(PAGE_CSP));
    response
}

pub fn resource_response(content_type: Option<&str>, body: Vec<u8>) -> Response {
    let content_type = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static("sandbox"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    response
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>{code} {reason}</title></head>
<body style="font-family:sans-serif;padding:40px;background:#0a0a0f;color:#e0e0e0;">
<h1 style="color:#ff6666;">{code} {reason}</h1><p>{message}</p>
</body></html>"#,
        code = status.as_u16(),
        reason = status.canonical_reason().unwrap_or("Error"),
        message = escape_html(message),
    )
}

/// Terminal failure of a request, rendered as an HTML error page.
#[derive(Debug)]
pub struct ApiError(pub ShroudError);

impl From<ShroudError> for ApiError {
    fn from(err: ShroudError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.is_upstream() || status.is_server_error() {
            warn!("Request failed ({}): {}", status.as_u16(), self.0);
        } else {
            debug!("Request rejected ({}): {}", status.as_u16(), self.0);
        }

        let mut response = (status, Html(error_page(status, &self.0.to_string()))).into_response();
        response
            .headers_mut()
            .insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
        response
    }
}
