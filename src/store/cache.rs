//! Read-only pack cache.
//!
//! Owned by whoever serves queries: the pack is read from disk on the first
//! `load()` and shared as an `Arc` until `invalidate()` is called. Nothing
//! reloads on its own.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{load_pack, LoadedPack, PackError};

#[derive(Clone)]
pub struct PackCache {
    root: PathBuf,
    inner: Arc<RwLock<Option<Arc<LoadedPack>>>>,
}

impl PackCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PackCache {
            root: root.into(),
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Return the cached pack, reading it on first use. A failed read leaves
    /// the cache empty so the next call tries again.
    pub async fn load(&self) -> Result<Arc<LoadedPack>, PackError> {
        if let Some(pack) = self.inner.read().await.as_ref() {
            return Ok(Arc::clone(pack));
        }

        let mut inner = self.inner.write().await;
        // another caller may have filled it while we waited
        if let Some(pack) = inner.as_ref() {
            return Ok(Arc::clone(pack));
        }

        let pack = Arc::new(load_pack(&self.root)?);
        debug!(
            "PackCache: loaded {:?} ({} matches, {} panels)",
            self.root,
            pack.stores.events_by_match.len(),
            pack.stores.panels.len()
        );
        *inner = Some(Arc::clone(&pack));
        Ok(pack)
    }

    pub async fn invalidate(&self) {
        let mut inner = self.inner.write().await;
        if inner.take().is_some() {
            debug!("PackCache: invalidated {:?}", self.root);
        }
    }
}
