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

//! Storage backends a migration reads from and writes to.
//!
//! Every backend implements the two-operation [`StorageBackend`] capability.
//! Layout: `backend.rs` (the trait), `filesystem.rs`, `object_storage.rs`
//! (S3 through the AWS SDK), `memory.rs`, `factory.rs` (construction from
//! configuration), `error.rs`.

pub mod backend;
pub mod error;
pub mod factory;
pub mod filesystem;
pub mod memory;
pub mod object_storage;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use factory::build_backend;
pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;
pub use object_storage::ObjectStorageBackend;
