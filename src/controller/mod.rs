//! # Controller
//!
//! Reconcilers for the three managed kinds and the watch wiring that binds
//! them to kube-runtime controllers.
//!
//! Each reconciler is a free function generic over the [`ObjectStore`]
//! implementation, so the same code path runs against the API server in
//! production and against [`crate::store::MemoryStore`] in tests. The
//! framework guarantees at most one in-flight reconcile per object key;
//! reconcilers keep no state across invocations and re-read every
//! dependency fresh.

pub mod client_key;
pub mod finalizer;
pub mod project;
pub mod team;

use std::fmt;
use std::future::{ready, Future};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::{watcher, Controller};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cli::Settings;
use crate::crd::{ClientKey, Project, Team};
use crate::observability::metrics;
use crate::sentry::{HttpSentryClient, SentryClient, SentryError};
use crate::store::{self, KubeStore};

/// Requeue delay after a failed reconcile. Backoff policy beyond this flat
/// retry is left to the cluster re-triggering changed objects.
const RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Errors surfaced by the reconcilers. Every variant triggers a requeue of
/// the same object key.
#[derive(Debug, Error)]
pub enum Error {
    #[error("object store request failed: {0}")]
    Store(#[from] store::Error),
    #[error("failed to get organization {slug}: {source}")]
    Organization { slug: String, source: SentryError },
    /// A referenced object is missing or has not been reconciled yet.
    /// Resolves on its own once the dependency converges.
    #[error("{kind} {namespace}/{name} is not ready: {reason}")]
    Dependency {
        kind: &'static str,
        namespace: String,
        name: String,
        reason: &'static str,
    },
    #[error("{context}: {source}")]
    Upstream {
        context: String,
        source: SentryError,
    },
    /// A recorded key id has no upstream counterpart. Recreating it silently
    /// would hand out new credentials behind the user's back, so this is
    /// surfaced instead.
    #[error("client key id {id} not found upstream in project {project}")]
    KeyVanished { id: String, project: String },
    #[error("{kind} {namespace}/{name} has no uid, cannot own its secret")]
    MissingUid {
        kind: &'static str,
        namespace: String,
        name: String,
    },
}

impl Error {
    pub(crate) fn upstream(context: impl Into<String>, source: SentryError) -> Self {
        Error::Upstream {
            context: context.into(),
            source,
        }
    }
}

/// Shared handles for one reconcile attempt: the object store, the Sentry
/// client and the slug of the managed organization.
pub struct Context<S> {
    pub store: S,
    pub sentry: Arc<dyn SentryClient>,
    pub organization: String,
}

impl<S: fmt::Debug> fmt::Debug for Context<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("store", &self.store)
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}

async fn instrumented(
    kind: &'static str,
    fut: impl Future<Output = Result<(), Error>>,
) -> Result<Action, Error> {
    metrics::observe_reconciliation(kind);
    let timer = metrics::reconcile_timer(kind);
    let result = fut.await;
    timer.observe_duration();
    result.map(|()| Action::await_change())
}

async fn reconcile_team(
    obj: Arc<Team>,
    ctx: Arc<Context<KubeStore>>,
) -> Result<Action, Error> {
    let namespace = obj.namespace().unwrap_or_default();
    instrumented("team", team::reconcile(&ctx, &namespace, &obj.name_any())).await
}

async fn reconcile_project(
    obj: Arc<Project>,
    ctx: Arc<Context<KubeStore>>,
) -> Result<Action, Error> {
    let namespace = obj.namespace().unwrap_or_default();
    instrumented(
        "project",
        project::reconcile(&ctx, &namespace, &obj.name_any()),
    )
    .await
}

async fn reconcile_client_key(
    obj: Arc<ClientKey>,
    ctx: Arc<Context<KubeStore>>,
) -> Result<Action, Error> {
    let namespace = obj.namespace().unwrap_or_default();
    instrumented(
        "clientkey",
        client_key::reconcile(&ctx, &namespace, &obj.name_any()),
    )
    .await
}

fn error_policy<K>(obj: Arc<K>, err: &Error, _ctx: Arc<Context<KubeStore>>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    error!(
        kind = %kind,
        namespace = obj.meta().namespace.as_deref().unwrap_or(""),
        name = obj.meta().name.as_deref().unwrap_or(""),
        error = %err,
        "reconciliation failed, requeueing"
    );
    metrics::observe_reconciliation_error(&kind);
    Action::requeue(RETRY_INTERVAL)
}

/// Start the three controllers and run them until shutdown.
///
/// Team, Project and ClientKey each get their own controller watching their
/// kind cluster-wide; the ClientKey controller additionally watches the
/// Secrets it owns so a tampered or deleted Secret is re-projected.
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .context("failed to create kubernetes client")?;

    let sentry = HttpSentryClient::new(
        &settings.api_endpoint,
        &settings.api_token,
        Duration::from_secs(settings.timeout_secs),
    )
    .context("failed to create sentry client")?;

    let ctx = Arc::new(Context {
        store: KubeStore::new(client.clone()),
        sentry: Arc::new(sentry),
        organization: settings.organization.clone(),
    });

    info!(organization = %settings.organization, "starting controllers");

    let teams = Controller::new(Api::<Team>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile_team, error_policy, Arc::clone(&ctx))
        .for_each(|result| {
            match result {
                Ok((obj, _)) => debug!(object = %obj, "reconciled team"),
                Err(err) => warn!(error = %err, "team controller stream error"),
            }
            ready(())
        });

    let projects = Controller::new(
        Api::<Project>::all(client.clone()),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(reconcile_project, error_policy, Arc::clone(&ctx))
    .for_each(|result| {
        match result {
            Ok((obj, _)) => debug!(object = %obj, "reconciled project"),
            Err(err) => warn!(error = %err, "project controller stream error"),
        }
        ready(())
    });

    let client_keys = Controller::new(
        Api::<ClientKey>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(Api::<Secret>::all(client), watcher::Config::default())
    .shutdown_on_signal()
    .run(reconcile_client_key, error_policy, Arc::clone(&ctx))
    .for_each(|result| {
        match result {
            Ok((obj, _)) => debug!(object = %obj, "reconciled client key"),
            Err(err) => warn!(error = %err, "client key controller stream error"),
        }
        ready(())
    });

    tokio::join!(teams, projects, client_keys);

    info!("controllers stopped");
    Ok(())
}
