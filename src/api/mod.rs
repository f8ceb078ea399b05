//! Dashboard REST API
//!
//! Serves computed metrics as JSON to the presentation layer. Every GET
//! endpoint accepts `preset`, `start`, `end` and `platforms` query
//! parameters; see [`types::WindowQuery`].

pub mod handlers;
mod server;
pub mod types;

pub use server::{router, ApiServer};
pub use types::{ApiError, ApiResponse, WindowQuery};
