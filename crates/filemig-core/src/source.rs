//! Enumeration of the items a run migrates.

use async_trait::async_trait;

use crate::error::BoxError;

/// Produces the complete list of items for a run.
///
/// Called exactly once per run, before any transfer starts. The list is
/// materialized up front; there is no streaming enumeration.
#[async_trait]
pub trait ItemSource<I>: Send + Sync {
    /// List every item to migrate.
    ///
    /// # Errors
    ///
    /// Any error aborts the run before a backend is touched.
    async fn list_items(&self) -> Result<Vec<I>, BoxError>;
}

/// Item source handing out a fixed list.
///
/// Each run receives a clone of the list.
#[derive(Debug, Clone, Default)]
pub struct StaticItems<I> {
    items: Vec<I>,
}

impl<I> StaticItems<I> {
    /// Serve `items` on every run.
    #[must_use]
    pub const fn new(items: Vec<I>) -> Self {
        Self { items }
    }

    /// Number of items served per run.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when runs will have nothing to do.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<I> FromIterator<I> for StaticItems<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl<I> ItemSource<I> for StaticItems<I>
where
    I: Clone + Send + Sync,
{
    async fn list_items(&self) -> Result<Vec<I>, BoxError> {
        Ok(self.items.clone())
    }
}
