//! Reconciler for `Project` objects.

use tracing::{debug, info};

use crate::crd::{Project, ProjectStatus, Team};
use crate::sentry::Organization;
use crate::store::ObjectStore;

use super::{finalizer, Context, Error};

/// Converge one `Project` object. Beyond the Team shape, creation needs the
/// referenced Team resolved to its upstream slug first.
pub async fn reconcile<S: ObjectStore>(
    ctx: &Context<S>,
    namespace: &str,
    name: &str,
) -> Result<(), Error> {
    let Some(mut project) = ctx.store.get::<Project>(namespace, name).await? else {
        debug!(namespace, name, "project is gone, nothing to do");
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

    if project.metadata.deletion_timestamp.is_some() {
        return finalize(ctx, project, &org).await;
    }

    if !finalizer::has_finalizer(&project) {
        finalizer::add_finalizer(&mut project);
        project = ctx.store.update(&project).await?;
        debug!(namespace, name, "added finalizer");
    }

    let team_slug = resolve_team(ctx, &project, namespace).await?;

    let slug = project.observed_slug().to_owned();
    if slug.is_empty() {
        let created = ctx
            .sentry
            .create_project(
                &org.slug,
                &team_slug,
                &project.spec.name,
                project.spec.slug.as_deref(),
            )
            .await
            .map_err(|e| {
                Error::upstream(format!("failed to create project {}", project.spec.name), e)
            })?;
        project.status = Some(ProjectStatus {
            slug: created.slug.clone(),
            team: team_slug,
            organization: org.slug.clone(),
        });
        ctx.store.update(&project).await?;
        info!(namespace, name, slug = %created.slug, "created project upstream");
        return Ok(());
    }

    // Rename only. The Sentry API cannot move a project to another team, so
    // team drift is never acted on.
    let upstream = ctx
        .sentry
        .get_project(&org.slug, &slug)
        .await
        .map_err(|e| Error::upstream(format!("failed to get project {slug}"), e))?;
    if upstream.name != project.spec.name {
        ctx.sentry
            .update_project(&org.slug, &slug, &project.spec.name)
            .await
            .map_err(|e| Error::upstream(format!("failed to rename project {slug}"), e))?;
        info!(namespace, name, slug = %slug, "renamed project upstream");
    }

    Ok(())
}

/// Resolve the referenced Team object to its upstream slug. Fails until the
/// Team exists and has itself been reconciled.
async fn resolve_team<S: ObjectStore>(
    ctx: &Context<S>,
    project: &Project,
    fallback_namespace: &str,
) -> Result<String, Error> {
    let team_ref = &project.spec.team_ref;
    let team_namespace = team_ref.namespace_or(fallback_namespace);

    let team = ctx
        .store
        .get::<Team>(team_namespace, &team_ref.name)
        .await?
        .ok_or_else(|| Error::Dependency {
            kind: "Team",
            namespace: team_namespace.to_owned(),
            name: team_ref.name.clone(),
            reason: "object not found",
        })?;

    let team_slug = team.observed_slug();
    if team_slug.is_empty() {
        return Err(Error::Dependency {
            kind: "Team",
            namespace: team_namespace.to_owned(),
            name: team_ref.name.clone(),
            reason: "team has not been created upstream yet",
        });
    }
    Ok(team_slug.to_owned())
}

async fn finalize<S: ObjectStore>(
    ctx: &Context<S>,
    mut project: Project,
    org: &Organization,
) -> Result<(), Error> {
    if !finalizer::has_finalizer(&project) {
        return Ok(());
    }

    let slug = project.observed_slug().to_owned();
    if !slug.is_empty() {
        ctx.sentry
            .delete_project(&org.slug, &slug)
            .await
            .map_err(|e| Error::upstream(format!("failed to delete project {slug}"), e))?;
    }

    project.status = None;
    finalizer::remove_finalizer(&mut project);
    ctx.store.update(&project).await?;
    info!(slug = %slug, "project finalized");
    Ok(())
}
