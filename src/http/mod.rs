//! Server-side HTTP error handling.
//!
//! # Data Flow
//! ```text
//! request
//!     → middleware.rs (attach ErrorReporter, hold back the response)
//!     → handler.rs / axum handler (writes a response, returns or reports an error)
//!     → middleware.rs (pick effective error, call on_error)
//!     → writer.rs (ResponseWriter collects the final response)
//!     → respond.rs (axum IntoResponse for error types)
//!     → server.rs (timeout + trace layers, graceful shutdown)
//!     → Send to client
//! ```

pub mod handler;
pub mod middleware;
pub mod respond;
pub mod server;
pub mod writer;

pub use handler::{handler_fn, HandlerFn};
pub use middleware::{report_error, write_error, ErrorLayer, ErrorReporter, Middleware};
pub use writer::ResponseWriter;
