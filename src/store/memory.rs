//! In-memory [`ObjectStore`] double for tests.
//!
//! Objects are stored as JSON values keyed by (kind, namespace, name).
//! Updates enforce optimistic concurrency against a numeric
//! resourceVersion, and writes are counted per kind so tests can assert
//! that convergent reconciles perform no redundant writes.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{object_key, Error, ObjectStore, StoreObject};

type ObjectKey = (String, String, String);

/// Fake implementation of [`ObjectStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<ObjectKey, serde_json::Value>,
    writes: BTreeMap<String, u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store state poisoned")
    }

    /// Seed an object as existing cluster state, assigning an initial
    /// resourceVersion. Does not count as a write.
    pub fn seed<K: StoreObject>(&self, obj: K) -> Result<(), Error> {
        let (namespace, name) = object_key(&obj)?;
        let mut obj = obj;
        obj.meta_mut().resource_version = Some("1".to_owned());
        let value = serde_json::to_value(&obj)?;
        self.state()
            .objects
            .insert((K::kind(&()).into_owned(), namespace, name), value);
        Ok(())
    }

    /// Number of create + update calls recorded for the kind.
    #[must_use]
    pub fn writes<K: StoreObject>(&self) -> u64 {
        self.state()
            .writes
            .get(K::kind(&()).as_ref())
            .copied()
            .unwrap_or(0)
    }
}

impl MemoryState {
    fn record_write(&mut self, kind: &str) {
        *self.writes.entry(kind.to_owned()).or_insert(0) += 1;
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, Error> {
        let key = (
            K::kind(&()).into_owned(),
            namespace.to_owned(),
            name.to_owned(),
        );
        match self.state().objects.get(&key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let kind = K::kind(&()).into_owned();
        let (namespace, name) = object_key(obj)?;
        let key = (kind.clone(), namespace.clone(), name.clone());

        let mut state = self.state();
        if state.objects.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind,
                namespace,
                name,
            });
        }
        let mut created = obj.clone();
        created.meta_mut().resource_version = Some("1".to_owned());
        state.objects.insert(key, serde_json::to_value(&created)?);
        state.record_write(&kind);
        Ok(created)
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let kind = K::kind(&()).into_owned();
        let (namespace, name) = object_key(obj)?;
        let key = (kind.clone(), namespace.clone(), name.clone());

        let mut state = self.state();
        let Some(stored) = state.objects.get(&key) else {
            return Err(Error::NotFound {
                kind,
                namespace,
                name,
            });
        };

        let stored_version = stored
            .pointer("/metadata/resourceVersion")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("0")
            .to_owned();
        let incoming_version = obj.meta().resource_version.clone().unwrap_or_default();
        if incoming_version != stored_version {
            return Err(Error::Conflict {
                kind,
                namespace,
                name,
                reason: format!(
                    "resourceVersion {incoming_version} is stale, current is {stored_version}"
                ),
            });
        }

        let next_version = stored_version.parse::<u64>().unwrap_or(0) + 1;
        let mut updated = obj.clone();
        updated.meta_mut().resource_version = Some(next_version.to_string());
        state.objects.insert(key, serde_json::to_value(&updated)?);
        state.record_write(&kind);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use kube::api::ObjectMeta;

    use crate::crd::{Team, TeamSpec};

    use super::*;

    fn team(name: &str) -> Team {
        Team {
            metadata: ObjectMeta {
                namespace: Some("testing".to_owned()),
                name: Some(name.to_owned()),
                ..ObjectMeta::default()
            },
            spec: TeamSpec {
                name: "Test Team".to_owned(),
                slug: None,
            },
            status: None,
        }
    }

    #[tokio::test]
    async fn get_returns_none_for_missing_objects() {
        let store = MemoryStore::new();
        let got: Option<Team> = store.get("testing", "missing").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = MemoryStore::new();
        store.create(&team("a")).await.unwrap();
        let err = store.create(&team("a")).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_rejects_stale_resource_versions() {
        let store = MemoryStore::new();
        let created = store.create(&team("a")).await.unwrap();

        let fresh = store.update(&created).await.unwrap();
        assert_eq!(fresh.metadata.resource_version.as_deref(), Some("2"));

        // Writing through the original (now stale) copy must conflict.
        let err = store.update(&created).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn update_requires_an_existing_object() {
        let store = MemoryStore::new();
        let err = store.update(&team("a")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn writes_are_counted_per_kind() {
        let store = MemoryStore::new();
        assert_eq!(store.writes::<Team>(), 0);
        let created = store.create(&team("a")).await.unwrap();
        store.update(&created).await.unwrap();
        assert_eq!(store.writes::<Team>(), 2);
    }
}
