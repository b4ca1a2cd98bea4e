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

//! Shared fixtures for migration tests: scripted backends, recording
//! notifiers and call-counting path policies.

pub mod backend;
pub mod fixtures;

pub use backend::{BackendCall, ScriptedBackend, ScriptedFailure};
pub use fixtures::{CountingPolicy, FailingItems, RecordingNotifier};
