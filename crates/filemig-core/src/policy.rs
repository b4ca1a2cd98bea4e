//! Mapping from items to backend paths.

use std::fmt;

use crate::error::BoxError;

/// Computes where an item is read from and where it is written to.
///
/// Both methods are pure with respect to the item. The source path is
/// resolved before the fetch, the destination path only after the fetch
/// succeeded.
pub trait PathPolicy<I>: Send + Sync {
    /// Path of the item on the source backend.
    ///
    /// # Errors
    ///
    /// Returns an error when no path can be derived; the item is then
    /// reported as failed without touching either backend.
    fn source_path(&self, item: &I) -> Result<String, BoxError>;

    /// Path of the item on the destination backend.
    ///
    /// # Errors
    ///
    /// Returns an error when no path can be derived; the store is then
    /// skipped and the item reported as failed.
    fn destination_path(&self, item: &I) -> Result<String, BoxError>;
}

/// Path policy built from two closures.
pub struct FnPathPolicy<S, D> {
    source: S,
    destination: D,
}

impl<S, D> FnPathPolicy<S, D> {
    /// Wrap a source-path and a destination-path function.
    pub const fn new<I>(source: S, destination: D) -> Self
    where
        S: Fn(&I) -> Result<String, BoxError>,
        D: Fn(&I) -> Result<String, BoxError>,
    {
        Self {
            source,
            destination,
        }
    }
}

impl<S, D> fmt::Debug for FnPathPolicy<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPathPolicy").finish_non_exhaustive()
    }
}

impl<I, S, D> PathPolicy<I> for FnPathPolicy<S, D>
where
    S: Fn(&I) -> Result<String, BoxError> + Send + Sync,
    D: Fn(&I) -> Result<String, BoxError> + Send + Sync,
{
    fn source_path(&self, item: &I) -> Result<String, BoxError> {
        (self.source)(item)
    }

    fn destination_path(&self, item: &I) -> Result<String, BoxError> {
        (self.destination)(item)
    }
}
