//! In-memory [`SentryClient`] double for tests.
//!
//! Entities live in ordered `Vec`s behind a mutex. Status-code semantics
//! match the HTTP adapter: lookups of missing entities fail with a 404
//! [`SentryError::Api`], deletes of missing entities succeed, and created
//! keys get monotonically increasing numeric ids with the fixed DSN triple
//! `"public"` / `"secret"` / `"csp"`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::types::{ClientKey, ClientKeyDsn, Organization, Project, Team};
use super::{SentryClient, SentryError};

/// Fake implementation of [`SentryClient`].
#[derive(Debug, Default)]
pub struct FakeSentryClient {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    organizations: Vec<Organization>,
    teams: Vec<Team>,
    projects: Vec<Project>,
    client_keys: Vec<ClientKey>,
    next_key_id: u64,
    fail_all: Option<u16>,
    fail_deletes: Option<u16>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            organizations: Vec::new(),
            teams: Vec::new(),
            projects: Vec::new(),
            client_keys: Vec::new(),
            next_key_id: 1,
            fail_all: None,
            fail_deletes: None,
        }
    }
}

impl FakeSentryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake sentry state poisoned")
    }

    /// Seed an organization.
    pub fn add_organization(&self, slug: &str) {
        self.state().organizations.push(Organization {
            slug: slug.to_owned(),
            name: String::new(),
        });
    }

    /// Seed a team.
    pub fn add_team(&self, slug: &str, name: &str) {
        self.state().teams.push(Team {
            slug: slug.to_owned(),
            name: name.to_owned(),
        });
    }

    /// Seed a project.
    pub fn add_project(&self, slug: &str, name: &str) {
        self.state().projects.push(Project {
            slug: slug.to_owned(),
            name: name.to_owned(),
        });
    }

    /// Seed a client key. Keeps generated ids monotonic past the seeded one.
    pub fn add_client_key(&self, key: ClientKey) {
        let mut state = self.state();
        if let Ok(id) = key.id.parse::<u64>() {
            if id >= state.next_key_id {
                state.next_key_id = id + 1;
            }
        }
        state.client_keys.push(key);
    }

    /// Make every operation fail with the given status until cleared.
    pub fn fail_requests(&self, status: u16) {
        self.state().fail_all = Some(status);
    }

    /// Make delete operations fail with the given status until cleared.
    pub fn fail_deletes(&self, status: u16) {
        self.state().fail_deletes = Some(status);
    }

    /// Clear any injected failures.
    pub fn succeed_requests(&self) {
        let mut state = self.state();
        state.fail_all = None;
        state.fail_deletes = None;
    }

    #[must_use]
    pub fn teams(&self) -> Vec<Team> {
        self.state().teams.clone()
    }

    #[must_use]
    pub fn projects(&self) -> Vec<Project> {
        self.state().projects.clone()
    }

    #[must_use]
    pub fn client_keys(&self) -> Vec<ClientKey> {
        self.state().client_keys.clone()
    }

    fn slugify(name: &str) -> String {
        name.to_lowercase().replace(' ', "-")
    }
}

fn api_error(method: &str, url: String, status: u16, body: &str) -> SentryError {
    SentryError::Api {
        method: method.to_owned(),
        url,
        status,
        body: body.to_owned(),
    }
}

fn not_found(method: &str, url: String) -> SentryError {
    api_error(method, url, 404, "not found")
}

impl State {
    fn check(&self, method: &str, url: &str) -> Result<(), SentryError> {
        if let Some(status) = self.fail_all {
            return Err(api_error(method, url.to_owned(), status, "injected failure"));
        }
        Ok(())
    }

    fn check_delete(&self, url: &str) -> Result<(), SentryError> {
        self.check("DELETE", url)?;
        if let Some(status) = self.fail_deletes {
            return Err(api_error("DELETE", url.to_owned(), status, "injected failure"));
        }
        Ok(())
    }

    fn project_exists(&self, slug: &str) -> bool {
        self.projects.iter().any(|p| p.slug == slug)
    }
}

#[async_trait]
impl SentryClient for FakeSentryClient {
    async fn get_organization(&self, slug: &str) -> Result<Organization, SentryError> {
        let state = self.state();
        let url = format!("organizations/{slug}/");
        state.check("GET", &url)?;
        state
            .organizations
            .iter()
            .find(|o| o.slug == slug)
            .cloned()
            .ok_or_else(|| not_found("GET", url))
    }

    async fn get_team(&self, org: &str, slug: &str) -> Result<Team, SentryError> {
        let state = self.state();
        let url = format!("teams/{org}/{slug}/");
        state.check("GET", &url)?;
        state
            .teams
            .iter()
            .find(|t| t.slug == slug)
            .cloned()
            .ok_or_else(|| not_found("GET", url))
    }

    async fn create_team(
        &self,
        org: &str,
        name: &str,
        slug: Option<&str>,
    ) -> Result<Team, SentryError> {
        let mut state = self.state();
        let url = format!("organizations/{org}/teams/");
        state.check("POST", &url)?;
        let team = Team {
            slug: slug.map_or_else(|| Self::slugify(name), str::to_owned),
            name: name.to_owned(),
        };
        state.teams.push(team.clone());
        Ok(team)
    }

    async fn update_team(&self, org: &str, slug: &str, name: &str) -> Result<Team, SentryError> {
        let mut state = self.state();
        let url = format!("teams/{org}/{slug}/");
        state.check("PUT", &url)?;
        let team = state
            .teams
            .iter_mut()
            .find(|t| t.slug == slug)
            .ok_or_else(|| not_found("PUT", url))?;
        team.name = name.to_owned();
        Ok(team.clone())
    }

    async fn delete_team(&self, org: &str, slug: &str) -> Result<(), SentryError> {
        let mut state = self.state();
        state.check_delete(&format!("teams/{org}/{slug}/"))?;
        state.teams.retain(|t| t.slug != slug);
        Ok(())
    }

    async fn get_project(&self, org: &str, slug: &str) -> Result<Project, SentryError> {
        let state = self.state();
        let url = format!("projects/{org}/{slug}/");
        state.check("GET", &url)?;
        state
            .projects
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| not_found("GET", url))
    }

    async fn create_project(
        &self,
        org: &str,
        team: &str,
        name: &str,
        slug: Option<&str>,
    ) -> Result<Project, SentryError> {
        let mut state = self.state();
        let url = format!("teams/{org}/{team}/projects/");
        state.check("POST", &url)?;
        let project = Project {
            slug: slug.map_or_else(|| Self::slugify(name), str::to_owned),
            name: name.to_owned(),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        org: &str,
        slug: &str,
        name: &str,
    ) -> Result<Project, SentryError> {
        let mut state = self.state();
        let url = format!("projects/{org}/{slug}/");
        state.check("PUT", &url)?;
        let project = state
            .projects
            .iter_mut()
            .find(|p| p.slug == slug)
            .ok_or_else(|| not_found("PUT", url))?;
        project.name = name.to_owned();
        Ok(project.clone())
    }

    async fn delete_project(&self, org: &str, slug: &str) -> Result<(), SentryError> {
        let mut state = self.state();
        state.check_delete(&format!("projects/{org}/{slug}/"))?;
        state.projects.retain(|p| p.slug != slug);
        Ok(())
    }

    async fn list_client_keys(
        &self,
        org: &str,
        project: &str,
    ) -> Result<Vec<ClientKey>, SentryError> {
        let state = self.state();
        let url = format!("projects/{org}/{project}/keys/");
        state.check("GET", &url)?;
        if !state.project_exists(project) {
            return Err(not_found("GET", url));
        }
        Ok(state.client_keys.clone())
    }

    async fn create_client_key(
        &self,
        org: &str,
        project: &str,
        name: &str,
    ) -> Result<ClientKey, SentryError> {
        let mut state = self.state();
        let url = format!("projects/{org}/{project}/keys/");
        state.check("POST", &url)?;
        if !state.project_exists(project) {
            return Err(not_found("POST", url));
        }
        let key = ClientKey {
            id: state.next_key_id.to_string(),
            name: name.to_owned(),
            dsn: ClientKeyDsn {
                public: "public".to_owned(),
                secret: "secret".to_owned(),
                csp: "csp".to_owned(),
            },
        };
        state.next_key_id += 1;
        state.client_keys.push(key.clone());
        Ok(key)
    }

    async fn update_client_key(
        &self,
        org: &str,
        project: &str,
        id: &str,
        name: &str,
    ) -> Result<ClientKey, SentryError> {
        let mut state = self.state();
        let url = format!("projects/{org}/{project}/keys/{id}/");
        state.check("PUT", &url)?;
        if !state.project_exists(project) {
            return Err(not_found("PUT", url));
        }
        let key = state
            .client_keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| not_found("PUT", url))?;
        key.name = name.to_owned();
        Ok(key.clone())
    }

    async fn delete_client_key(
        &self,
        org: &str,
        project: &str,
        id: &str,
    ) -> Result<(), SentryError> {
        let mut state = self.state();
        state.check_delete(&format!("projects/{org}/{project}/keys/{id}/"))?;
        state.client_keys.retain(|k| k.id != id);
        Ok(())
    }
}
