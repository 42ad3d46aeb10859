//! `Project` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ObjectRef;

/// Desired state of a Sentry project.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "sentry.microscaler.io",
    version = "v1alpha1",
    kind = "Project",
    namespaced,
    status = "ProjectStatus",
    printcolumn = r#"{"name":"Slug", "type":"string", "jsonPath":".status.slug"}"#,
    printcolumn = r#"{"name":"Team", "type":"string", "jsonPath":".status.team"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Project name shown in the Sentry UI. Renames are propagated upstream.
    pub name: String,
    /// Requested project slug. When omitted, Sentry derives one from the
    /// name; the slug actually assigned is recorded in `status.slug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Team this project belongs to. The referenced `Team` object must have
    /// been reconciled (non-empty `status.slug`) before the project can be
    /// created upstream. The team cannot be changed after creation; the
    /// Sentry API does not support reassignment.
    pub team_ref: ObjectRef,
}

/// Observed state of a Sentry project.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    /// Slug of the project created upstream. Empty until adopted.
    #[serde(default)]
    pub slug: String,
    /// Slug of the team the project was created under.
    #[serde(default)]
    pub team: String,
    /// Organization the project was created under.
    #[serde(default)]
    pub organization: String,
}

impl Project {
    /// Slug recorded from the upstream create, or `""` before adoption.
    #[must_use]
    pub fn observed_slug(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.slug.as_str())
    }
}
