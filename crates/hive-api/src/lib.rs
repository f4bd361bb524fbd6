//! HTTP surface of the hive panel.
//!
//! Handlers stay thin: they parse the request, call into `hive_core`, and map
//! the result through [`ApiError`]. Engine rejections are returned to the
//! client with the engine's own status and body.
mod error;
pub use error::ApiError;

mod state;
pub use state::PanelState;

mod session;

mod http;
pub use http::HttpApi;

pub use axum;
