//! Reconciler for `Team` objects.

use tracing::{debug, info};

use crate::crd::{Team, TeamStatus};
use crate::sentry::Organization;
use crate::store::ObjectStore;

use super::{finalizer, Context, Error};

/// Converge one `Team` object: create the upstream team on first sight,
/// rename it on spec drift, delete it when the object is marked for
/// deletion.
pub async fn reconcile<S: ObjectStore>(
    ctx: &Context<S>,
    namespace: &str,
    name: &str,
) -> Result<(), Error> {
    let Some(mut team) = ctx.store.get::<Team>(namespace, name).await? else {
        debug!(namespace, name, "team is gone, nothing to do");
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

    if team.metadata.deletion_timestamp.is_some() {
        return finalize(ctx, team, &org).await;
    }

    // The finalizer must be persisted before the first upstream mutation so
    // a crash after create still leads to cleanup.
    if !finalizer::has_finalizer(&team) {
        finalizer::add_finalizer(&mut team);
        team = ctx.store.update(&team).await?;
        debug!(namespace, name, "added finalizer");
    }

    let slug = team.observed_slug().to_owned();
    if slug.is_empty() {
        // Adopt: the one non-idempotent upstream call. The assigned slug is
        // recorded in status before anything else happens to this object.
        let created = ctx
            .sentry
            .create_team(&org.slug, &team.spec.name, team.spec.slug.as_deref())
            .await
            .map_err(|e| {
                Error::upstream(format!("failed to create team {}", team.spec.name), e)
            })?;
        team.status = Some(TeamStatus {
            slug: created.slug.clone(),
            organization: org.slug.clone(),
        });
        ctx.store.update(&team).await?;
        info!(namespace, name, slug = %created.slug, "created team upstream");
        return Ok(());
    }

    let upstream = ctx
        .sentry
        .get_team(&org.slug, &slug)
        .await
        .map_err(|e| Error::upstream(format!("failed to get team {slug}"), e))?;
    if upstream.name != team.spec.name {
        ctx.sentry
            .update_team(&org.slug, &slug, &team.spec.name)
            .await
            .map_err(|e| Error::upstream(format!("failed to rename team {slug}"), e))?;
        info!(namespace, name, slug = %slug, "renamed team upstream");
    }

    Ok(())
}

/// Delete-side of the state machine. Any upstream failure leaves finalizer
/// and status untouched so the deletion is retried.
async fn finalize<S: ObjectStore>(
    ctx: &Context<S>,
    mut team: Team,
    org: &Organization,
) -> Result<(), Error> {
    if !finalizer::has_finalizer(&team) {
        return Ok(());
    }

    let slug = team.observed_slug().to_owned();
    if !slug.is_empty() {
        ctx.sentry
            .delete_team(&org.slug, &slug)
            .await
            .map_err(|e| Error::upstream(format!("failed to delete team {slug}"), e))?;
    }

    team.status = None;
    finalizer::remove_finalizer(&mut team);
    ctx.store.update(&team).await?;
    info!(slug = %slug, "team finalized");
    Ok(())
}
