//! Reconciler for `ClientKey` objects and their derived Secrets.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::Resource;
use tracing::{debug, info};

use crate::crd::{ClientKey, ClientKeyStatus, Project};
use crate::observability::metrics;
use crate::sentry::{self, Organization};
use crate::store::ObjectStore;

use super::{finalizer, Context, Error};

/// Converge one `ClientKey` object: ensure the key exists upstream under
/// the referenced project, correct name drift, then project its DSN triple
/// into the owned Secret.
pub async fn reconcile<S: ObjectStore>(
    ctx: &Context<S>,
    namespace: &str,
    name: &str,
) -> Result<(), Error> {
    let Some(mut client_key) = ctx.store.get::<ClientKey>(namespace, name).await? else {
        debug!(namespace, name, "client key is gone, nothing to do");
        return Ok(());
    };

    let org = ctx
        .sentry
        .get_organization(&ctx.organization)
        .await
        .map_err(|source| Error::Organization {
            slug: ctx.organization.clone(),
            source,
        })?;

    if client_key.metadata.deletion_timestamp.is_some() {
        return finalize(ctx, client_key, &org).await;
    }

    if !finalizer::has_finalizer(&client_key) {
        finalizer::add_finalizer(&mut client_key);
        client_key = ctx.store.update(&client_key).await?;
        debug!(namespace, name, "added finalizer");
    }

    let project_slug = resolve_project(ctx, &client_key, namespace).await?;

    // Adopt or locate. The created id is persisted in the same attempt,
    // before any further action, so a crash here resumes on replay instead
    // of minting a second key.
    let key = if client_key.observed_id().is_empty() {
        let created = ctx
            .sentry
            .create_client_key(&org.slug, &project_slug, &client_key.spec.name)
            .await
            .map_err(|e| {
                Error::upstream(
                    format!("failed to create client key for project {project_slug}"),
                    e,
                )
            })?;
        client_key.status = Some(ClientKeyStatus {
            id: created.id.clone(),
            project: project_slug.clone(),
            organization: org.slug.clone(),
        });
        client_key = ctx.store.update(&client_key).await?;
        info!(namespace, name, id = %created.id, "created client key upstream");
        created
    } else {
        let id = client_key.observed_id().to_owned();
        let keys = ctx
            .sentry
            .list_client_keys(&org.slug, &project_slug)
            .await
            .map_err(|e| {
                Error::upstream(
                    format!("failed to list client keys for project {project_slug}"),
                    e,
                )
            })?;
        keys.into_iter()
            .find(|k| k.id == id)
            .ok_or(Error::KeyVanished {
                id,
                project: project_slug.clone(),
            })?
    };

    if key.name != client_key.spec.name {
        ctx.sentry
            .update_client_key(&org.slug, &project_slug, &key.id, &client_key.spec.name)
            .await
            .map_err(|e| {
                Error::upstream(format!("failed to rename client key {}", key.id), e)
            })?;
        info!(namespace, name, id = %key.id, "renamed client key upstream");
    }

    project_secret(ctx, &client_key, &key).await
}

/// Resolve the referenced Project object to its upstream slug. Fails until
/// the Project exists and has itself been reconciled.
async fn resolve_project<S: ObjectStore>(
    ctx: &Context<S>,
    client_key: &ClientKey,
    fallback_namespace: &str,
) -> Result<String, Error> {
    let project_ref = &client_key.spec.project_ref;
    let project_namespace = project_ref.namespace_or(fallback_namespace);

    let project = ctx
        .store
        .get::<Project>(project_namespace, &project_ref.name)
        .await?
        .ok_or_else(|| Error::Dependency {
            kind: "Project",
            namespace: project_namespace.to_owned(),
            name: project_ref.name.clone(),
            reason: "object not found",
        })?;

    let project_slug = project.observed_slug();
    if project_slug.is_empty() {
        return Err(Error::Dependency {
            kind: "Project",
            namespace: project_namespace.to_owned(),
            name: project_ref.name.clone(),
            reason: "project has not been created upstream yet",
        });
    }
    Ok(project_slug.to_owned())
}

/// Mirror the key's DSN triple into the Secret owned by this ClientKey.
/// Created when absent, overwritten only when the data differs.
async fn project_secret<S: ObjectStore>(
    ctx: &Context<S>,
    client_key: &ClientKey,
    key: &sentry::ClientKey,
) -> Result<(), Error> {
    let namespace = client_key.metadata.namespace.as_deref().unwrap_or_default();
    let name = client_key.metadata.name.as_deref().unwrap_or_default();

    let data: BTreeMap<String, ByteString> = [
        (
            "dsn.public".to_owned(),
            ByteString(key.dsn.public.clone().into_bytes()),
        ),
        (
            "dsn.secret".to_owned(),
            ByteString(key.dsn.secret.clone().into_bytes()),
        ),
        (
            "dsn.csp".to_owned(),
            ByteString(key.dsn.csp.clone().into_bytes()),
        ),
    ]
    .into();

    match ctx.store.get::<Secret>(namespace, name).await? {
        None => {
            let owner_ref = client_key
                .controller_owner_ref(&())
                .ok_or_else(|| Error::MissingUid {
                    kind: "ClientKey",
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                })?;
            let secret = Secret {
                metadata: ObjectMeta {
                    namespace: Some(namespace.to_owned()),
                    name: Some(name.to_owned()),
                    owner_references: Some(vec![owner_ref]),
                    ..ObjectMeta::default()
                },
                type_: Some("Opaque".to_owned()),
                data: Some(data),
                ..Secret::default()
            };
            ctx.store.create(&secret).await?;
            metrics::observe_secret_write();
            info!(namespace, name, "created dsn secret");
        }
        Some(mut existing) => {
            if existing.data.as_ref() != Some(&data) {
                existing.data = Some(data);
                ctx.store.update(&existing).await?;
                metrics::observe_secret_write();
                info!(namespace, name, "updated dsn secret");
            }
        }
    }

    Ok(())
}

async fn finalize<S: ObjectStore>(
    ctx: &Context<S>,
    mut client_key: ClientKey,
    org: &Organization,
) -> Result<(), Error> {
    if !finalizer::has_finalizer(&client_key) {
        return Ok(());
    }

    // The owned Secret is garbage-collected by the cluster; only the
    // upstream key needs explicit cleanup.
    if let Some(status) = client_key.status.clone().filter(|s| !s.id.is_empty()) {
        ctx.sentry
            .delete_client_key(&org.slug, &status.project, &status.id)
            .await
            .map_err(|e| {
                Error::upstream(format!("failed to delete client key {}", status.id), e)
            })?;
    }

    client_key.status = None;
    finalizer::remove_finalizer(&mut client_key);
    ctx.store.update(&client_key).await?;
    info!("client key finalized");
    Ok(())
}
