//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! error on its way to the wire
//!     → logging.rs (structured log event, private cause included)
//!
//! sink misuse / middleware resolution
//!     → tracing events from writer.rs and middleware.rs
//! ```

pub mod logging;
