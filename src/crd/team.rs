//! `Team` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a Sentry team.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "sentry.microscaler.io",
    version = "v1alpha1",
    kind = "Team",
    namespaced,
    status = "TeamStatus",
    printcolumn = r#"{"name":"Slug", "type":"string", "jsonPath":".status.slug"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TeamSpec {
    /// Team name shown in the Sentry UI. Renames are propagated upstream.
    pub name: String,
    /// Requested team slug. When omitted, Sentry derives one from the name;
    /// the slug actually assigned is recorded in `status.slug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Observed state of a Sentry team.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamStatus {
    /// Slug of the team created upstream. Empty until the team is adopted.
    #[serde(default)]
    pub slug: String,
    /// Organization the team was created under.
    #[serde(default)]
    pub organization: String,
}

impl Team {
    /// Slug recorded from the upstream create, or `""` before adoption.
    #[must_use]
    pub fn observed_slug(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.slug.as_str())
    }
}
