//! `reqwest`-based adapter for the Sentry REST API.
//!
//! Endpoints follow <https://docs.sentry.io/api/>; all requests are JSON,
//! bearer-token authenticated, and bounded by the client-wide timeout so no
//! reconcile attempt can block past its deadline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::observability::metrics;

use super::types::{ClientKey, Organization, Project, Team};
use super::{SentryClient, SentryError};

/// Production [`SentryClient`] speaking JSON over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpSentryClient {
    http: reqwest::Client,
    base_url: Url,
}

/// Request body for create and rename calls; teams, projects and keys all
/// take the same shape.
#[derive(Serialize)]
struct NamePayload<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<&'a str>,
}

impl HttpSentryClient {
    /// Build a client against `endpoint` (e.g. `https://sentry.io/api/0/`),
    /// authenticating every request with `token` and bounding every request
    /// by `timeout`.
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, SentryError> {
        // Url::join drops the last path segment without a trailing slash.
        let endpoint = if endpoint.ends_with('/') {
            endpoint.to_owned()
        } else {
            format!("{endpoint}/")
        };
        let base_url = Url::parse(&endpoint).map_err(|e| SentryError::Url(e.to_string()))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| SentryError::Url("api token contains invalid header characters".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, SentryError> {
        self.base_url
            .join(path)
            .map_err(|e| SentryError::Url(e.to_string()))
    }

    /// Map non-success responses to [`SentryError::Api`], keeping status and
    /// body. Success is 200/201/204.
    async fn check(
        method: &str,
        url: &Url,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SentryError> {
        let status = response.status();
        if matches!(
            status,
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
        ) {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SentryError::Api {
            method: method.to_owned(),
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SentryError> {
        let url = self.url(path)?;
        metrics::observe_sentry_request("GET");
        let response = self.http.get(url.clone()).send().await?;
        Ok(Self::check("GET", &url, response).await?.json().await?)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SentryError> {
        let url = self.url(path)?;
        metrics::observe_sentry_request("POST");
        let response = self.http.post(url.clone()).json(body).send().await?;
        Ok(Self::check("POST", &url, response).await?.json().await?)
    }

    async fn put_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SentryError> {
        let url = self.url(path)?;
        metrics::observe_sentry_request("PUT");
        let response = self.http.put(url.clone()).json(body).send().await?;
        Ok(Self::check("PUT", &url, response).await?.json().await?)
    }

    /// DELETE with idempotent semantics: a 404 means the entity is already
    /// gone, which is the state the caller wanted.
    async fn delete(&self, path: &str) -> Result<(), SentryError> {
        let url = self.url(path)?;
        metrics::observe_sentry_request("DELETE");
        let response = self.http.delete(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check("DELETE", &url, response).await?;
        Ok(())
    }
}

#[async_trait]
impl SentryClient for HttpSentryClient {
    async fn get_organization(&self, slug: &str) -> Result<Organization, SentryError> {
        self.get_json(&format!("organizations/{slug}/")).await
    }

    async fn get_team(&self, org: &str, slug: &str) -> Result<Team, SentryError> {
        self.get_json(&format!("teams/{org}/{slug}/")).await
    }

    async fn create_team(
        &self,
        org: &str,
        name: &str,
        slug: Option<&str>,
    ) -> Result<Team, SentryError> {
        self.post_json(
            &format!("organizations/{org}/teams/"),
            &NamePayload { name, slug },
        )
        .await
    }

    async fn update_team(&self, org: &str, slug: &str, name: &str) -> Result<Team, SentryError> {
        self.put_json(
            &format!("teams/{org}/{slug}/"),
            &NamePayload { name, slug: None },
        )
        .await
    }

    async fn delete_team(&self, org: &str, slug: &str) -> Result<(), SentryError> {
        self.delete(&format!("teams/{org}/{slug}/")).await
    }

    async fn get_project(&self, org: &str, slug: &str) -> Result<Project, SentryError> {
        self.get_json(&format!("projects/{org}/{slug}/")).await
    }

    async fn create_project(
        &self,
        org: &str,
        team: &str,
        name: &str,
        slug: Option<&str>,
    ) -> Result<Project, SentryError> {
        self.post_json(
            &format!("teams/{org}/{team}/projects/"),
            &NamePayload { name, slug },
        )
        .await
    }

    async fn update_project(
        &self,
        org: &str,
        slug: &str,
        name: &str,
    ) -> Result<Project, SentryError> {
        self.put_json(
            &format!("projects/{org}/{slug}/"),
            &NamePayload { name, slug: None },
        )
        .await
    }

    async fn delete_project(&self, org: &str, slug: &str) -> Result<(), SentryError> {
        self.delete(&format!("projects/{org}/{slug}/")).await
    }

    async fn list_client_keys(
        &self,
        org: &str,
        project: &str,
    ) -> Result<Vec<ClientKey>, SentryError> {
        self.get_json(&format!("projects/{org}/{project}/keys/"))
            .await
    }

    async fn create_client_key(
        &self,
        org: &str,
        project: &str,
        name: &str,
    ) -> Result<ClientKey, SentryError> {
        self.post_json(
            &format!("projects/{org}/{project}/keys/"),
            &NamePayload { name, slug: None },
        )
        .await
    }

    async fn update_client_key(
        &self,
        org: &str,
        project: &str,
        id: &str,
        name: &str,
    ) -> Result<ClientKey, SentryError> {
        self.put_json(
            &format!("projects/{org}/{project}/keys/{id}/"),
            &NamePayload { name, slug: None },
        )
        .await
    }

    async fn delete_client_key(
        &self,
        org: &str,
        project: &str,
        id: &str,
    ) -> Result<(), SentryError> {
        self.delete(&format!("projects/{org}/{project}/keys/{id}/"))
            .await
    }
}
