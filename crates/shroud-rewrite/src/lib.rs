//! Rewrite engine for the sanitizing page proxy.
//!
//! A remote document is fetched anonymously, executable content is removed,
//! and every outbound reference (links, images, stylesheets, CSS `url()`)
//! is rewritten to a signed internal path so the browser never talks to the
//! remote host directly.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod css;
pub mod fetch;
pub mod handler;
pub mod html;
pub mod links;

pub use css::{find_url_tokens, CssRewriter, UrlToken};
pub use fetch::{is_private_destination, Fetch, FetchOptions, Fetched, RemoteFetcher};
pub use handler::ProxyHandler;
pub use html::{DomRewriter, RewrittenPage, SanitizeOptions};
pub use links::{is_data_uri, resolve_reference, LinkBuilder, Resolution};

#[cfg(test)]
pub(crate) mod testing;
