mod handlers;
mod responses;
mod server;
mod state;

pub use handlers::{split_resource_path, ProxyQuery};
pub use responses::{error_page, ApiError, HealthResponse, SKIPPED_HEADER};
pub use server::{router, ApiServer};
pub use state::AppState;
