#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;

pub use api::{router, ApiServer, AppState};
pub use config::{RedactedConfig, ShroudConfig};
