//! # Object Store
//!
//! Narrow abstraction over the Kubernetes object store as the reconcilers
//! consume it: get / create / update keyed by namespace + name, with
//! optimistic-concurrency update semantics. The same interface-plus-fake
//! pattern used for the Sentry client applies here so the reconcilers can be
//! exercised without a cluster.
//!
//! - [`KubeStore`] - production adapter over `kube::Api`
//! - [`MemoryStore`] - in-memory double with resourceVersion conflict
//!   checking, used by the reconciler tests

mod memory;

pub use memory::MemoryStore;

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::api::PostParams;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::crd::{ClientKey, Project, Team};

/// Errors returned by [`ObjectStore`] implementations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },
    /// Optimistic-concurrency failure; the caller must retry from a fresh
    /// get, which the controller framework does by re-running the reconcile.
    #[error("conflicting write to {kind} {namespace}/{name}: {reason}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        reason: String,
    },
    #[error("{kind} object is missing {field}")]
    IncompleteMetadata { kind: String, field: &'static str },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Kinds the reconcilers read and write through the store.
///
/// `STATUS_SUBRESOURCE` marks kinds whose status is persisted through the
/// status subresource; [`KubeStore::update`] writes it as part of the same
/// logical update so callers see a single primitive, as the reconcilers
/// expect.
pub trait StoreObject:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const STATUS_SUBRESOURCE: bool;
}

impl StoreObject for Team {
    const STATUS_SUBRESOURCE: bool = true;
}

impl StoreObject for Project {
    const STATUS_SUBRESOURCE: bool = true;
}

impl StoreObject for ClientKey {
    const STATUS_SUBRESOURCE: bool = true;
}

impl StoreObject for Secret {
    const STATUS_SUBRESOURCE: bool = false;
}

/// Get / create / update against the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch by namespace + name; `None` when the object does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str)
        -> Result<Option<K>, Error>;

    /// Create the object, failing with [`Error::AlreadyExists`] when an
    /// object with the same key is present.
    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, Error>;

    /// Replace the object, failing with [`Error::Conflict`] on a stale
    /// resourceVersion. Returns the persisted object.
    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, Error>;
}

/// Production [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn object_key<K: StoreObject>(obj: &K) -> Result<(String, String), Error> {
    let kind = K::kind(&()).into_owned();
    let namespace = obj.meta().namespace.clone().ok_or_else(|| {
        Error::IncompleteMetadata {
            kind: kind.clone(),
            field: "metadata.namespace",
        }
    })?;
    let name = obj
        .meta()
        .name
        .clone()
        .ok_or(Error::IncompleteMetadata {
            kind: kind.clone(),
            field: "metadata.name",
        })?;
    Ok((namespace, name))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, Error> {
        match self.api::<K>(namespace).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, name) = object_key(obj)?;
        match self
            .api::<K>(&namespace)
            .create(&PostParams::default(), obj)
            .await
        {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(err)) if err.code == 409 => Err(Error::AlreadyExists {
                kind: K::kind(&()).into_owned(),
                namespace,
                name,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, name) = object_key(obj)?;
        let api = self.api::<K>(&namespace);
        let pp = PostParams::default();

        let map_err = |err: kube::Error| match err {
            kube::Error::Api(api_err) if api_err.code == 409 => Error::Conflict {
                kind: K::kind(&()).into_owned(),
                namespace: namespace.clone(),
                name: name.clone(),
                reason: api_err.message,
            },
            kube::Error::Api(api_err) if api_err.code == 404 => Error::NotFound {
                kind: K::kind(&()).into_owned(),
                namespace: namespace.clone(),
                name: name.clone(),
            },
            other => other.into(),
        };

        let replaced = api.replace(&name, &pp, obj).await.map_err(map_err)?;
        if !K::STATUS_SUBRESOURCE {
            return Ok(replaced);
        }

        // The main replace ignores status for kinds with a status
        // subresource; write it with the fresh resourceVersion.
        let mut with_status = obj.clone();
        with_status.meta_mut().resource_version = replaced.meta().resource_version.clone();
        let data = serde_json::to_vec(&with_status)?;
        api.replace_status(&name, &pp, data).await.map_err(map_err)
    }
}
