#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod signer;

pub use signer::{derive_signing_key, generate_secret, LinkSigner, LINK_SIGNING_CONTEXT};
