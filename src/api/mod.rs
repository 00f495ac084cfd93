//! Request Gateway
//!
//! HTTP front for the settlement engine: decodes play requests, runs them
//! through the engine and maps tagged rejections onto status codes.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::{create_app, ApiServer};
