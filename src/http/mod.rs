//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → handlers.rs (select backend via load balancer)
//!     → upstream.rs (call the storage service)
//!     → response.rs (payload or JSON error, cache marker)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, X_CACHE};
pub use server::{AppState, HttpServer};
