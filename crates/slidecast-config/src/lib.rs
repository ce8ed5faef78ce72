#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Environment-backed configuration for the Slidecast service.
//!
//! Layout: `model.rs` (typed config sections), `defaults.rs` (default values),
//! `validate.rs` (parsing helpers), `loader.rs` (environment loading).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    AppConfig, EncoderConfig, FetchConfig, LogSettings, RenderDefaults, ServerConfig,
    StorageConfig,
};
