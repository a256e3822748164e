//! Override tracker.
//!
//! Two persistent sets drive the override state machine:
//!
//! - `listening`: tabs whose last zoom the controller applied or confirmed,
//!   and whose next user zoom counts as an override
//! - `overridden`: origins where the user reverted an automatic zoom; they
//!   are not auto-zoomed again
//!
//! Listening membership is only meaningful for the lifetime of the host
//! process and is cleared on startup. Overrides persist.

use std::sync::Arc;

use autozoom_core::{Origin, TabId};
use tracing::{debug, info, warn};

use crate::error::StateResult;
use crate::locks::KeyedLocks;
use crate::set::PersistentSet;
use crate::store::KeyValueStore;

pub const LISTENING_SET: &str = "listening";
pub const OVERRIDDEN_SET: &str = "overridden";

pub struct OverrideTracker {
    listening: PersistentSet,
    overridden: PersistentSet,
    locks: KeyedLocks,
}

impl OverrideTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            listening: PersistentSet::new(LISTENING_SET, store.clone()),
            overridden: PersistentSet::new(OVERRIDDEN_SET, store),
            locks: KeyedLocks::new(),
        }
    }

    // ── Overrides ──────────────────────────────────────────────────

    pub async fn is_overridden(&self, origin: &Origin) -> StateResult<bool> {
        let _guard = self.locks.lock(&self.overridden.member_key(origin.as_str())).await;
        self.overridden.contains(origin.as_str()).await
    }

    pub async fn mark_overridden(&self, origin: &Origin) -> StateResult<()> {
        let _guard = self.locks.lock(&self.overridden.member_key(origin.as_str())).await;
        self.overridden.add(origin.as_str()).await?;
        info!(%origin, "origin marked overridden");
        Ok(())
    }

    /// Forget an override so the origin is auto-zoomed again.
    pub async fn clear_override(&self, origin: &Origin) -> StateResult<bool> {
        let _guard = self.locks.lock(&self.overridden.member_key(origin.as_str())).await;
        let removed = self.overridden.remove(origin.as_str()).await?;
        if removed {
            info!(%origin, "override cleared");
        }
        Ok(removed)
    }

    pub async fn clear_all_overrides(&self) -> StateResult<u32> {
        let removed = self.overridden.clear().await?;
        info!(removed, "all overrides cleared");
        Ok(removed)
    }

    pub async fn overridden_origins(&self) -> StateResult<Vec<String>> {
        let mut origins = self.overridden.members().await?;
        origins.sort();
        Ok(origins)
    }

    // ── Listening ──────────────────────────────────────────────────

    pub async fn is_listening(&self, tab_id: TabId) -> StateResult<bool> {
        let member = tab_id.to_string();
        let _guard = self.locks.lock(&self.listening.member_key(&member)).await;
        self.listening.contains(&member).await
    }

    pub async fn start_listening(&self, tab_id: TabId) -> StateResult<()> {
        let member = tab_id.to_string();
        let _guard = self.locks.lock(&self.listening.member_key(&member)).await;
        self.listening.add(&member).await?;
        debug!(tab_id, "listening for zoom changes");
        Ok(())
    }

    /// Returns whether the tab was listening.
    pub async fn stop_listening(&self, tab_id: TabId) -> StateResult<bool> {
        let member = tab_id.to_string();
        let _guard = self.locks.lock(&self.listening.member_key(&member)).await;
        let was_listening = self.listening.remove(&member).await?;
        if was_listening {
            debug!(tab_id, "stopped listening");
        }
        Ok(was_listening)
    }

    /// Drop every listening tab. Tab ids do not survive a host restart.
    pub async fn clear_all_listening(&self) -> StateResult<()> {
        let removed = self.listening.clear().await?;
        info!(removed, "listening tabs cleared");
        Ok(())
    }

    pub async fn listening_tabs(&self) -> StateResult<Vec<TabId>> {
        let mut tabs = Vec::new();
        for member in self.listening.members().await? {
            match member.parse::<TabId>() {
                Ok(tab_id) => tabs.push(tab_id),
                Err(e) => warn!(%member, error = %e, "ignoring malformed listening entry"),
            }
        }
        tabs.sort_unstable();
        Ok(tabs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::store::{StateStore, StoreFuture};

    fn origin(url: &str) -> Origin {
        Origin::from_url(url).unwrap()
    }

    fn memory_tracker() -> (Arc<dyn KeyValueStore>, OverrideTracker) {
        let store: Arc<dyn KeyValueStore> = Arc::new(StateStore::open_in_memory().unwrap());
        (store.clone(), OverrideTracker::new(store))
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<Vec<u8>>> {
            Box::pin(async { Err(StateError::Backend("disk gone".into())) })
        }

        fn set<'a>(&'a self, _key: &'a str, _value: &'a [u8]) -> StoreFuture<'a, ()> {
            Box::pin(async { Err(StateError::Backend("disk gone".into())) })
        }

        fn remove<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, bool> {
            Box::pin(async { Err(StateError::Backend("disk gone".into())) })
        }

        fn keys<'a>(&'a self, _prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
            Box::pin(async { Err(StateError::Backend("disk gone".into())) })
        }
    }

    #[tokio::test]
    async fn overrides_roundtrip() {
        let (_, tracker) = memory_tracker();
        let site = origin("https://example.com/article");

        assert!(!tracker.is_overridden(&site).await.unwrap());
        tracker.mark_overridden(&site).await.unwrap();
        assert!(tracker.is_overridden(&site).await.unwrap());
        assert!(!tracker.is_overridden(&origin("https://other.example")).await.unwrap());

        assert!(tracker.clear_override(&site).await.unwrap());
        assert!(!tracker.clear_override(&site).await.unwrap());
        assert!(!tracker.is_overridden(&site).await.unwrap());
    }

    #[tokio::test]
    async fn listening_roundtrip() {
        let (_, tracker) = memory_tracker();

        tracker.start_listening(3).await.unwrap();
        tracker.start_listening(12).await.unwrap();
        assert!(tracker.is_listening(3).await.unwrap());
        assert!(!tracker.is_listening(4).await.unwrap());
        assert_eq!(tracker.listening_tabs().await.unwrap(), vec![3, 12]);

        assert!(tracker.stop_listening(3).await.unwrap());
        assert!(!tracker.stop_listening(3).await.unwrap());
        assert_eq!(tracker.listening_tabs().await.unwrap(), vec![12]);
    }

    #[tokio::test]
    async fn listening_tabs_skips_malformed_members() {
        let (store, tracker) = memory_tracker();
        tracker.start_listening(5).await.unwrap();
        store.set("listening/not-a-tab", &[]).await.unwrap();
        assert_eq!(tracker.listening_tabs().await.unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn restart_clears_listening_but_keeps_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.redb");
        let site = origin("https://news.example");

        {
            let store: Arc<dyn KeyValueStore> = Arc::new(StateStore::open(&path).unwrap());
            let tracker = OverrideTracker::new(store);
            tracker.start_listening(1).await.unwrap();
            tracker.start_listening(2).await.unwrap();
            tracker.mark_overridden(&site).await.unwrap();
        }

        let store: Arc<dyn KeyValueStore> = Arc::new(StateStore::open(&path).unwrap());
        let tracker = OverrideTracker::new(store);
        assert_eq!(tracker.listening_tabs().await.unwrap(), vec![1, 2]);

        tracker.clear_all_listening().await.unwrap();
        assert!(tracker.listening_tabs().await.unwrap().is_empty());
        assert!(tracker.is_overridden(&site).await.unwrap());
    }

    #[tokio::test]
    async fn clear_all_overrides_leaves_listening_alone() {
        let (_, tracker) = memory_tracker();
        tracker.mark_overridden(&origin("https://a.example")).await.unwrap();
        tracker.mark_overridden(&origin("http://b.example")).await.unwrap();
        tracker.start_listening(9).await.unwrap();

        assert_eq!(
            tracker.overridden_origins().await.unwrap(),
            vec!["http://b.example".to_string(), "https://a.example".to_string()]
        );
        assert_eq!(tracker.clear_all_overrides().await.unwrap(), 2);
        assert!(tracker.overridden_origins().await.unwrap().is_empty());
        assert!(tracker.is_listening(9).await.unwrap());
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let tracker = OverrideTracker::new(Arc::new(BrokenStore));
        let site = origin("https://example.com");

        assert!(matches!(
            tracker.mark_overridden(&site).await,
            Err(StateError::Backend(_))
        ));
        assert!(tracker.is_overridden(&site).await.is_err());
        assert!(tracker.start_listening(1).await.is_err());
        assert!(tracker.stop_listening(1).await.is_err());
        assert!(tracker.clear_all_listening().await.is_err());
    }

    #[tokio::test]
    async fn concurrent_updates_to_different_tabs() {
        let (_, tracker) = memory_tracker();
        let tracker = Arc::new(tracker);

        let mut handles = Vec::new();
        for tab_id in 0..16 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker.start_listening(tab_id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(tracker.listening_tabs().await.unwrap().len(), 16);
    }
}
