//! Token store trait.

use std::sync::Arc;

use crate::{Result, TokenPair};

/// Holds the current [`TokenPair`].
///
/// A `set` or `clear` is visible to every later `get` on the same store.
/// Implementations are handed to clients explicitly so tests can use
/// isolated instances.
pub trait TokenStore: Send + Sync {
    /// Returns the stored pair, or `None` if nothing (unexpired) is stored.
    fn get(&self) -> Result<Option<TokenPair>>;

    /// Replace the stored pair.
    fn set(&self, pair: TokenPair) -> Result<()>;

    /// Remove the stored pair. Clearing an empty store succeeds.
    fn clear(&self) -> Result<()>;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn get(&self) -> Result<Option<TokenPair>> {
        (**self).get()
    }

    fn set(&self, pair: TokenPair) -> Result<()> {
        (**self).set(pair)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}
