#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! File-backed configuration for migration runs.
//!
//! Layout: `model.rs` (typed configuration documents), `loader.rs` (reading,
//! format detection and `${VAR}` expansion), `validate.rs` (field checks),
//! `defaults.rs` (shared default values).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{DEFAULT_LOG_LEVEL, DEFAULT_REGION};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, expand_env_refs, load_config, parse_config, resolve_env_refs};
pub use model::{
    BackendConfig, FilesystemConfig, LoggingSettings, MigrationConfig, ObjectStorageConfig,
    PathTemplates,
};
pub use validate::validate_config;
