//! `ClientKey` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ObjectRef;

/// Desired state of a Sentry client key.
///
/// Reconciling a `ClientKey` also maintains a derived core/v1 `Secret` with
/// the same namespace and name, holding the key's DSN credential triple
/// (`dsn.public`, `dsn.secret`, `dsn.csp`). The Secret is owned by the
/// `ClientKey` and garbage-collected with it.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "sentry.microscaler.io",
    version = "v1alpha1",
    kind = "ClientKey",
    namespaced,
    status = "ClientKeyStatus",
    printcolumn = r#"{"name":"Id", "type":"string", "jsonPath":".status.id"}"#,
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".status.project"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClientKeySpec {
    /// Label of the key shown in the Sentry UI. Renames are propagated
    /// upstream.
    pub name: String,
    /// Project this key belongs to. The referenced `Project` object must
    /// have been reconciled (non-empty `status.slug`) before the key can be
    /// created upstream.
    pub project_ref: ObjectRef,
}

/// Observed state of a Sentry client key.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientKeyStatus {
    /// Identifier of the key created upstream. Empty until adopted.
    #[serde(default)]
    pub id: String,
    /// Slug of the project the key was created under.
    #[serde(default)]
    pub project: String,
    /// Organization the key was created under.
    #[serde(default)]
    pub organization: String,
}

impl ClientKey {
    /// Key id recorded from the upstream create, or `""` before adoption.
    #[must_use]
    pub fn observed_id(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.id.as_str())
    }
}
