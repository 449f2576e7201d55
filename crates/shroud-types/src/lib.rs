#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod rewrite;

pub use error::{ShroudError, ShroudResult};
pub use key::{SignedToken, SigningKey};
pub use rewrite::{Endpoints, RewriteReport, RewriteTarget};

pub const SIGNING_KEY_SIZE: usize = 32;

pub const DEFAULT_PROXY_PATH: &str = "/proxy";

pub const DEFAULT_IMAGE_PATH: &str = "/image/";

/// Marker placed between the image endpoint prefix and the token.
pub const IMAGE_SIGNATURE_MARKER: &str = ",s";

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 2_000;

pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

pub const DEFAULT_MAX_REDIRECTS: usize = 5;

pub const DEFAULT_USER_AGENT: &str = concat!("shroud/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_REMOVED_ELEMENTS: &[&str] = &[
    "script", "iframe", "frame", "frameset", "object", "embed", "applet", "base",
];
