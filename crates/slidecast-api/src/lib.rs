#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! HTTP surface for Slidecast: render submission, job polling, downloads,
//! synchronous rendering, health and metrics.
//!
//! Layout: `http/` (router, handlers, middleware, problem responses),
//! `models.rs` (wire DTOs), `state.rs` (shared handler state),
//! `error.rs` (server lifecycle errors).

pub mod error;
pub mod http;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
