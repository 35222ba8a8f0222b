//! HTTP adapter over the identhub core
//!
//! Every handler is a thin translation of a request body into a session
//! call; the server identity lives behind one shared lock.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
