//! In-process token store.

use std::sync::{PoisonError, RwLock};

use crate::traits::TokenStore;
use crate::{Result, TokenPair};

/// Keeps the pair in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    pair: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `pair`.
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<TokenPair>> {
        let pair = self.pair.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pair.clone())
    }

    fn set(&self, pair: TokenPair) -> Result<()> {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = Some(pair);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStore")
            .field("pair", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessToken, RefreshToken};

    fn pair(access: &str) -> TokenPair {
        TokenPair::new(AccessToken::new(access), RefreshToken::new("refresh"), 3600)
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = MemoryTokenStore::new();
        let p = pair("access");
        store.set(p.clone()).unwrap();
        assert_eq!(store.get().unwrap(), Some(p));
    }

    #[test]
    fn set_overwrites() {
        let store = MemoryTokenStore::with_pair(pair("old"));
        store.set(pair("new")).unwrap();
        assert_eq!(store.get().unwrap().unwrap().access_token.as_str(), "new");
    }

    #[test]
    fn clear_twice_leaves_store_empty() {
        let store = MemoryTokenStore::with_pair(pair("access"));
        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
    }
}
