pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod init;
pub mod pages;
pub mod routes;
pub mod scenario;
pub mod session;
pub mod state;
pub mod storage;
pub mod video;

pub use config::{Config, ScenarioOutput};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use scenario::{FormInput, Scenario};
pub use state::AppState;
pub use video::{VideoError, VideoOutput, VideoResult, VideoStatus};

/// Cuts `input` to at most `max_chars` characters for log lines and error text.
pub(crate) fn snippet(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
