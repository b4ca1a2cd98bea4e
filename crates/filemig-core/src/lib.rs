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

//! Migration orchestrator.
//!
//! A [`Migration`] lists items from an [`ItemSource`], derives two paths per
//! item through a [`PathPolicy`], and moves each payload from a source to a
//! destination [`filemig_storage::StorageBackend`]. Every item is reported to
//! a [`CompletionNotifier`] exactly once; the run as a whole ends in a
//! [`RunSummary`] or a [`RunError`].

pub mod error;
pub mod migration;
pub mod notify;
pub mod policy;
pub mod source;
mod tally;
pub mod transfer;

pub use error::{BoxError, RunError, RunResult, TransferError, error_chain};
pub use migration::Migration;
pub use notify::{CompletionNotifier, ItemReport, NoopNotifier};
pub use policy::{FnPathPolicy, PathPolicy};
pub use source::{ItemSource, StaticItems};
pub use tally::RunSummary;
pub use transfer::TransferStage;
