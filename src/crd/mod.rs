//! # Custom Resource Definitions
//!
//! CRD types for the Sentry controller, group `sentry.microscaler.io`,
//! version `v1alpha1`.
//!
//! Three kinds are managed, forming a dependency chain:
//!
//! - [`Team`] - a Sentry team in the managed organization
//! - [`Project`] - a Sentry project, referencing a `Team` object
//! - [`ClientKey`] - a Sentry client key, referencing a `Project` object
//!
//! Each spec declares desired state; each status records the identifiers the
//! upstream service actually assigned. An empty observed identifier means the
//! resource has not been created upstream yet.

mod client_key;
mod project;
mod team;

pub use client_key::{ClientKey, ClientKeySpec, ClientKeyStatus};
pub use project::{Project, ProjectSpec, ProjectStatus};
pub use team::{Team, TeamSpec, TeamStatus};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to another object managed by this controller, by store identity
/// (namespace + name), not by upstream slug. The slug is resolved from the
/// referenced object's status at reconcile time.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    /// Name of the referenced object.
    pub name: String,
    /// Namespace of the referenced object. Defaults to the namespace of the
    /// referencing resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectRef {
    /// Namespace to resolve against, falling back to the referencing
    /// object's own namespace.
    #[must_use]
    pub fn namespace_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(fallback)
    }
}
