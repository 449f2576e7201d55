mod commands;
mod config_cmd;
mod rewrite;
mod run;
mod sign;
mod utils;

pub use commands::{Cli, Commands};
pub use config_cmd::handle_config;
pub use rewrite::rewrite_page;
pub use run::run_server;
pub use sign::sign_url;
pub use utils::{init_logging, show_version};
