//! Default values applied when configuration documents omit optional fields.

/// Log level used when neither the document nor `RUST_LOG` specify one.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Region assumed for object storage when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Placeholder rendered in place of secret material.
pub(crate) const REDACTED: &str = "***";
