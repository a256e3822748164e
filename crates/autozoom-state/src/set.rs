//! A named set of strings kept in a [`KeyValueStore`].
//!
//! Each member is its own entry at `{name}/{member}` with an empty value,
//! so adding or removing one member never rewrites the others.

use std::sync::Arc;

use tracing::debug;

use crate::error::StateResult;
use crate::store::KeyValueStore;

pub struct PersistentSet {
    name: String,
    prefix: String,
    store: Arc<dyn KeyValueStore>,
}

impl PersistentSet {
    pub fn new(name: &str, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            name: name.to_string(),
            prefix: format!("{name}/"),
            store,
        }
    }

    /// Storage key of a member; also used as its lock key.
    pub fn member_key(&self, member: &str) -> String {
        format!("{}{member}", self.prefix)
    }

    pub async fn add(&self, member: &str) -> StateResult<()> {
        self.store.set(&self.member_key(member), &[]).await
    }

    /// Remove a member. Returns true if it was present.
    pub async fn remove(&self, member: &str) -> StateResult<bool> {
        self.store.remove(&self.member_key(member)).await
    }

    pub async fn contains(&self, member: &str) -> StateResult<bool> {
        Ok(self.store.get(&self.member_key(member)).await?.is_some())
    }

    pub async fn members(&self) -> StateResult<Vec<String>> {
        let keys = self.store.keys(&self.prefix).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }

    /// Remove every member. Returns the number removed.
    pub async fn clear(&self) -> StateResult<u32> {
        let mut removed = 0;
        for key in self.store.keys(&self.prefix).await? {
            if self.store.remove(&key).await? {
                removed += 1;
            }
        }
        debug!(set = %self.name, removed, "persistent set cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;

    fn set(name: &str, store: &Arc<dyn KeyValueStore>) -> PersistentSet {
        PersistentSet::new(name, store.clone())
    }

    fn memory_store() -> Arc<dyn KeyValueStore> {
        Arc::new(StateStore::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn add_contains_remove() {
        let store = memory_store();
        let tabs = set("tabs", &store);

        assert!(!tabs.contains("1").await.unwrap());
        tabs.add("1").await.unwrap();
        assert!(tabs.contains("1").await.unwrap());

        assert!(tabs.remove("1").await.unwrap());
        assert!(!tabs.remove("1").await.unwrap());
        assert!(!tabs.contains("1").await.unwrap());
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let store = memory_store();
        let tabs = set("tabs", &store);
        tabs.add("1").await.unwrap();
        tabs.add("1").await.unwrap();
        assert_eq!(tabs.members().await.unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn members_with_slashes_roundtrip() {
        let store = memory_store();
        let origins = set("origins", &store);
        origins.add("https://example.com").await.unwrap();
        assert_eq!(
            origins.members().await.unwrap(),
            vec!["https://example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn sets_sharing_a_store_are_independent() {
        let store = memory_store();
        let a = set("a", &store);
        let ab = set("ab", &store);
        a.add("x").await.unwrap();
        ab.add("y").await.unwrap();

        assert_eq!(a.members().await.unwrap(), vec!["x".to_string()]);
        assert_eq!(a.clear().await.unwrap(), 1);
        assert!(ab.contains("y").await.unwrap());
    }

    #[tokio::test]
    async fn clear_removes_all_members() {
        let store = memory_store();
        let tabs = set("tabs", &store);
        for tab in ["1", "2", "3"] {
            tabs.add(tab).await.unwrap();
        }
        assert_eq!(tabs.clear().await.unwrap(), 3);
        assert!(tabs.members().await.unwrap().is_empty());
        assert_eq!(tabs.clear().await.unwrap(), 0);
    }
}
