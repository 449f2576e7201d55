mod constants;
mod daemon;
mod fetch;
mod logging;
mod rewrite;
mod security;
mod server;
mod types;

pub use constants::*;
pub use daemon::{RedactedConfig, ShroudConfig};
pub use fetch::FetchConfig;
pub use logging::LoggingConfig;
pub use rewrite::RewriteConfig;
pub use security::SecurityConfig;
pub use server::ServerConfig;
pub use types::*;

#[cfg(test)]
mod tests;
