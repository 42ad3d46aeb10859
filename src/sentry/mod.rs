//! # Sentry API Client
//!
//! Typed interface over the subset of the Sentry REST API the controller
//! uses: organizations, teams, projects and client keys, one operation per
//! entity per verb.
//!
//! Two implementations exist:
//!
//! - [`HttpSentryClient`] - the production adapter, JSON over HTTPS via
//!   `reqwest`, bearer-token authenticated, deadline-bound per request
//! - [`FakeSentryClient`] - an in-memory double with identical status-code
//!   semantics, used by the reconciler tests
//!
//! `DELETE` of an entity that is already gone is success for both
//! implementations; every other non-2xx response surfaces as
//! [`SentryError::Api`] with the status and response body intact.

mod fake;
mod http;
mod types;

pub use fake::FakeSentryClient;
pub use http::HttpSentryClient;
pub use types::{ClientKey, ClientKeyDsn, Organization, Project, Team};

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by [`SentryClient`] implementations.
#[derive(Debug, Error)]
pub enum SentryError {
    /// Non-success response from the Sentry API, body carried verbatim.
    #[error("{method} {url}: {status}: {body}")]
    Api {
        method: String,
        url: String,
        status: u16,
        body: String,
    },
    /// Transport-level failure (connect, TLS, deadline).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The configured endpoint or a derived request URL is invalid.
    #[error("invalid api url: {0}")]
    Url(String),
}

impl SentryError {
    /// Whether the error is a 404-equivalent response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SentryError::Api { status: 404, .. })
    }

    /// Transport-status code carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            SentryError::Api { status, .. } => Some(*status),
            SentryError::Transport(err) => err.status().map(|s| s.as_u16()),
            SentryError::Url(_) => None,
        }
    }
}

/// Operations against the Sentry API used by the reconcilers.
///
/// Object-safe so the production and fake implementations are
/// interchangeable behind an `Arc<dyn SentryClient>`.
#[async_trait]
pub trait SentryClient: Send + Sync {
    async fn get_organization(&self, slug: &str) -> Result<Organization, SentryError>;

    async fn get_team(&self, org: &str, slug: &str) -> Result<Team, SentryError>;
    async fn create_team(
        &self,
        org: &str,
        name: &str,
        slug: Option<&str>,
    ) -> Result<Team, SentryError>;
    async fn update_team(&self, org: &str, slug: &str, name: &str) -> Result<Team, SentryError>;
    /// Deleting a team that no longer exists is success.
    async fn delete_team(&self, org: &str, slug: &str) -> Result<(), SentryError>;

    async fn get_project(&self, org: &str, slug: &str) -> Result<Project, SentryError>;
    async fn create_project(
        &self,
        org: &str,
        team: &str,
        name: &str,
        slug: Option<&str>,
    ) -> Result<Project, SentryError>;
    async fn update_project(
        &self,
        org: &str,
        slug: &str,
        name: &str,
    ) -> Result<Project, SentryError>;
    /// Deleting a project that no longer exists is success.
    async fn delete_project(&self, org: &str, slug: &str) -> Result<(), SentryError>;

    async fn list_client_keys(
        &self,
        org: &str,
        project: &str,
    ) -> Result<Vec<ClientKey>, SentryError>;
    async fn create_client_key(
        &self,
        org: &str,
        project: &str,
        name: &str,
    ) -> Result<ClientKey, SentryError>;
    async fn update_client_key(
        &self,
        org: &str,
        project: &str,
        id: &str,
        name: &str,
    ) -> Result<ClientKey, SentryError>;
    /// Deleting a key that no longer exists is success.
    async fn delete_client_key(&self, org: &str, project: &str, id: &str)
        -> Result<(), SentryError>;
}
