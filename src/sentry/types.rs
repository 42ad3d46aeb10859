//! Wire types for the subset of Sentry API entities the controller touches.
//!
//! Fields the controller does not read are omitted; Sentry responses carry
//! many more.

use serde::{Deserialize, Serialize};

/// A Sentry organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// A Sentry team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// A Sentry project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// A Sentry client key with its DSN credential triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientKey {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dsn: ClientKeyDsn,
}

/// The connection-credential triple issued per client key, projected into
/// the derived Secret as `dsn.public` / `dsn.secret` / `dsn.csp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientKeyDsn {
    #[serde(default)]
    pub public: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub csp: String,
}
