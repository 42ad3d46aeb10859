//! Reconciler tests against the in-memory store and the fake Sentry client.
//!
//! These cover the full state machine for each kind: adoption, drift
//! correction, finalizer handling and deletion, plus Secret projection for
//! client keys.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;

use sentry_controller::controller::{client_key, finalizer, project, team, Context, Error};
use sentry_controller::crd::{
    ClientKey, ClientKeySpec, ClientKeyStatus, ObjectRef, Project, ProjectSpec, ProjectStatus,
    Team, TeamSpec, TeamStatus,
};
use sentry_controller::sentry::{self, ClientKeyDsn, FakeSentryClient};
use sentry_controller::store::{MemoryStore, ObjectStore};

const ORG: &str = "my-sentry-org";
const NS: &str = "testing";

fn test_context(fake: &Arc<FakeSentryClient>) -> Context<MemoryStore> {
    let sentry: Arc<dyn sentry::SentryClient> = fake.clone();
    Context {
        store: MemoryStore::new(),
        sentry,
        organization: ORG.to_owned(),
    }
}

fn fake_with_org() -> Arc<FakeSentryClient> {
    let fake = Arc::new(FakeSentryClient::new());
    fake.add_organization(ORG);
    fake
}

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(NS.to_owned()),
        name: Some(name.to_owned()),
        uid: Some(format!("uid-{name}")),
        ..ObjectMeta::default()
    }
}

fn deleted_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        deletion_timestamp: Some(Time(chrono::Utc::now())),
        finalizers: Some(vec![finalizer::FINALIZER.to_owned()]),
        ..meta(name)
    }
}

fn dsn(public: &str, secret: &str, csp: &str) -> ClientKeyDsn {
    ClientKeyDsn {
        public: public.to_owned(),
        secret: secret.to_owned(),
        csp: csp.to_owned(),
    }
}

mod team_reconcile {
    use super::*;

    #[tokio::test]
    async fn ignores_missing_objects() {
        let fake = Arc::new(FakeSentryClient::new());
        let ctx = test_context(&fake);
        team::reconcile(&ctx, "not-found", "not-found").await.unwrap();
    }

    #[tokio::test]
    async fn errors_when_organization_is_missing() {
        let fake = Arc::new(FakeSentryClient::new());
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: meta("test"),
                spec: TeamSpec {
                    name: "Test Team".to_owned(),
                    slug: None,
                },
                status: None,
            })
            .unwrap();

        let err = team::reconcile(&ctx, NS, "test").await.unwrap_err();
        assert!(matches!(err, Error::Organization { .. }));
        assert!(fake.teams().is_empty());
    }

    #[tokio::test]
    async fn creates_upstream_team_and_records_status() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: meta("test"),
                spec: TeamSpec {
                    name: "Test Team".to_owned(),
                    slug: Some("test-team".to_owned()),
                },
                status: None,
            })
            .unwrap();

        team::reconcile(&ctx, NS, "test").await.unwrap();

        let teams = fake.teams();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].slug, "test-team");
        assert_eq!(teams[0].name, "Test Team");

        let stored: Team = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(
            stored.metadata.finalizers,
            Some(vec![finalizer::FINALIZER.to_owned()])
        );
        let status = stored.status.unwrap();
        assert_eq!(status.slug, "test-team");
        assert_eq!(status.organization, ORG);
    }

    #[tokio::test]
    async fn records_slug_derived_upstream_when_spec_omits_one() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: meta("platform"),
                spec: TeamSpec {
                    name: "Platform Team".to_owned(),
                    slug: None,
                },
                status: None,
            })
            .unwrap();

        team::reconcile(&ctx, NS, "platform").await.unwrap();

        let stored: Team = ctx.store.get(NS, "platform").await.unwrap().unwrap();
        assert_eq!(stored.observed_slug(), "platform-team");
    }

    #[tokio::test]
    async fn renames_upstream_team_on_name_drift() {
        let fake = fake_with_org();
        fake.add_team("test-team", "Old Name");
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: meta("test"),
                spec: TeamSpec {
                    name: "New Name".to_owned(),
                    slug: Some("test-team".to_owned()),
                },
                status: Some(TeamStatus {
                    slug: "test-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        team::reconcile(&ctx, NS, "test").await.unwrap();

        assert_eq!(fake.teams()[0].name, "New Name");
    }

    #[tokio::test]
    async fn second_reconcile_is_a_noop() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: meta("test"),
                spec: TeamSpec {
                    name: "Test Team".to_owned(),
                    slug: Some("test-team".to_owned()),
                },
                status: None,
            })
            .unwrap();

        team::reconcile(&ctx, NS, "test").await.unwrap();
        let writes_after_first = ctx.store.writes::<Team>();

        team::reconcile(&ctx, NS, "test").await.unwrap();

        assert_eq!(fake.teams().len(), 1);
        assert_eq!(ctx.store.writes::<Team>(), writes_after_first);
    }

    #[tokio::test]
    async fn deletion_removes_upstream_team_and_finalizer() {
        let fake = fake_with_org();
        fake.add_team("test-team", "Test Team");
        fake.add_team("other-team", "Other Team");
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: deleted_meta("test"),
                spec: TeamSpec {
                    name: "Test Team".to_owned(),
                    slug: Some("test-team".to_owned()),
                },
                status: Some(TeamStatus {
                    slug: "test-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        team::reconcile(&ctx, NS, "test").await.unwrap();

        let slugs: Vec<_> = fake.teams().into_iter().map(|t| t.slug).collect();
        assert_eq!(slugs, vec!["other-team".to_owned()]);

        let stored: Team = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(stored.metadata.finalizers, None);
        assert!(stored.status.is_none());
    }

    #[tokio::test]
    async fn deletion_completes_when_upstream_team_is_already_gone() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: deleted_meta("test"),
                spec: TeamSpec {
                    name: "Test Team".to_owned(),
                    slug: Some("test-team".to_owned()),
                },
                status: Some(TeamStatus {
                    slug: "test-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        team::reconcile(&ctx, NS, "test").await.unwrap();

        let stored: Team = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(stored.metadata.finalizers, None);
    }

    #[tokio::test]
    async fn deletion_failure_keeps_finalizer_and_status() {
        let fake = fake_with_org();
        fake.add_team("test-team", "Test Team");
        fake.fail_deletes(500);
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: deleted_meta("test"),
                spec: TeamSpec {
                    name: "Test Team".to_owned(),
                    slug: Some("test-team".to_owned()),
                },
                status: Some(TeamStatus {
                    slug: "test-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        let err = team::reconcile(&ctx, NS, "test").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));

        let stored: Team = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(
            stored.metadata.finalizers,
            Some(vec![finalizer::FINALIZER.to_owned()])
        );
        assert_eq!(stored.observed_slug(), "test-team");
        assert_eq!(fake.teams().len(), 1);
    }

    #[tokio::test]
    async fn deletion_without_finalizer_is_a_noop() {
        let fake = fake_with_org();
        fake.add_team("test-team", "Test Team");
        let ctx = test_context(&fake);
        let mut metadata = deleted_meta("test");
        metadata.finalizers = None;
        ctx.store
            .seed(Team {
                metadata,
                spec: TeamSpec {
                    name: "Test Team".to_owned(),
                    slug: Some("test-team".to_owned()),
                },
                status: Some(TeamStatus {
                    slug: "test-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        team::reconcile(&ctx, NS, "test").await.unwrap();

        // Upstream untouched, no writes performed.
        assert_eq!(fake.teams().len(), 1);
        assert_eq!(ctx.store.writes::<Team>(), 0);
    }
}

mod project_reconcile {
    use super::*;

    fn project_spec(team_name: &str) -> ProjectSpec {
        ProjectSpec {
            name: "My Test Project".to_owned(),
            slug: Some("my-test-project".to_owned()),
            team_ref: ObjectRef {
                name: team_name.to_owned(),
                namespace: None,
            },
        }
    }

    fn adopted_team(name: &str, slug: &str) -> Team {
        Team {
            metadata: meta(name),
            spec: TeamSpec {
                name: "Team".to_owned(),
                slug: Some(slug.to_owned()),
            },
            status: Some(TeamStatus {
                slug: slug.to_owned(),
                organization: ORG.to_owned(),
            }),
        }
    }

    #[tokio::test]
    async fn errors_when_referenced_team_is_missing() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(Project {
                metadata: meta("test"),
                spec: project_spec("team-not-found"),
                status: None,
            })
            .unwrap();

        let err = project::reconcile(&ctx, NS, "test").await.unwrap_err();
        assert!(matches!(err, Error::Dependency { kind: "Team", .. }));
        assert!(fake.projects().is_empty());
    }

    #[tokio::test]
    async fn errors_when_referenced_team_is_not_adopted_yet() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(Team {
                metadata: meta("team"),
                spec: TeamSpec {
                    name: "Team".to_owned(),
                    slug: None,
                },
                status: None,
            })
            .unwrap();
        ctx.store
            .seed(Project {
                metadata: meta("test"),
                spec: project_spec("team"),
                status: None,
            })
            .unwrap();

        let err = project::reconcile(&ctx, NS, "test").await.unwrap_err();
        assert!(matches!(err, Error::Dependency { kind: "Team", .. }));
        assert!(fake.projects().is_empty());
    }

    #[tokio::test]
    async fn creates_upstream_project_under_resolved_team() {
        let fake = fake_with_org();
        fake.add_team("my-team", "Team");
        let ctx = test_context(&fake);
        ctx.store.seed(adopted_team("team", "my-team")).unwrap();
        ctx.store
            .seed(Project {
                metadata: meta("test"),
                spec: project_spec("team"),
                status: None,
            })
            .unwrap();

        project::reconcile(&ctx, NS, "test").await.unwrap();

        let projects = fake.projects();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].slug, "my-test-project");

        let stored: Project = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(
            stored.metadata.finalizers,
            Some(vec![finalizer::FINALIZER.to_owned()])
        );
        let status = stored.status.unwrap();
        assert_eq!(status.slug, "my-test-project");
        assert_eq!(status.team, "my-team");
        assert_eq!(status.organization, ORG);
    }

    #[tokio::test]
    async fn renames_upstream_project_on_name_drift() {
        let fake = fake_with_org();
        fake.add_project("my-test-project", "Old Name");
        let ctx = test_context(&fake);
        ctx.store.seed(adopted_team("team", "my-team")).unwrap();
        ctx.store
            .seed(Project {
                metadata: meta("test"),
                spec: project_spec("team"),
                status: Some(ProjectStatus {
                    slug: "my-test-project".to_owned(),
                    team: "my-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        project::reconcile(&ctx, NS, "test").await.unwrap();

        assert_eq!(fake.projects()[0].name, "My Test Project");
    }

    #[tokio::test]
    async fn deletion_removes_upstream_project_and_finalizer() {
        let fake = fake_with_org();
        fake.add_project("my-test-project", "My Test Project");
        fake.add_project("other-project", "Other Project");
        let ctx = test_context(&fake);
        ctx.store
            .seed(Project {
                metadata: deleted_meta("test"),
                spec: project_spec("team"),
                status: Some(ProjectStatus {
                    slug: "my-test-project".to_owned(),
                    team: "my-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        project::reconcile(&ctx, NS, "test").await.unwrap();

        let slugs: Vec<_> = fake.projects().into_iter().map(|p| p.slug).collect();
        assert_eq!(slugs, vec!["other-project".to_owned()]);

        let stored: Project = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(stored.metadata.finalizers, None);
        assert!(stored.status.is_none());
    }

    #[tokio::test]
    async fn deletion_completes_when_upstream_project_is_already_gone() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(Project {
                metadata: deleted_meta("test"),
                spec: project_spec("team"),
                status: Some(ProjectStatus {
                    slug: "my-project".to_owned(),
                    team: "my-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        project::reconcile(&ctx, NS, "test").await.unwrap();

        let stored: Project = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(stored.metadata.finalizers, None);
    }

    #[tokio::test]
    async fn deletion_failure_keeps_finalizer_and_status() {
        let fake = fake_with_org();
        fake.add_project("my-test-project", "My Test Project");
        fake.fail_deletes(503);
        let ctx = test_context(&fake);
        ctx.store
            .seed(Project {
                metadata: deleted_meta("test"),
                spec: project_spec("team"),
                status: Some(ProjectStatus {
                    slug: "my-test-project".to_owned(),
                    team: "my-team".to_owned(),
                    organization: ORG.to_owned(),
                }),
            })
            .unwrap();

        let err = project::reconcile(&ctx, NS, "test").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));

        let stored: Project = ctx.store.get(NS, "test").await.unwrap().unwrap();
        assert_eq!(
            stored.metadata.finalizers,
            Some(vec![finalizer::FINALIZER.to_owned()])
        );
        assert_eq!(stored.observed_slug(), "my-test-project");
    }
}

mod client_key_reconcile {
    use super::*;

    fn key_spec(project_name: &str) -> ClientKeySpec {
        ClientKeySpec {
            name: "My Key".to_owned(),
            project_ref: ObjectRef {
                name: project_name.to_owned(),
                namespace: None,
            },
        }
    }

    fn adopted_project(name: &str, slug: &str) -> Project {
        Project {
            metadata: meta(name),
            spec: ProjectSpec {
                name: "Proj".to_owned(),
                slug: Some(slug.to_owned()),
                team_ref: ObjectRef {
                    name: "team".to_owned(),
                    namespace: None,
                },
            },
            status: Some(ProjectStatus {
                slug: slug.to_owned(),
                team: "my-team".to_owned(),
                organization: ORG.to_owned(),
            }),
        }
    }

    fn adopted_status(id: &str) -> ClientKeyStatus {
        ClientKeyStatus {
            id: id.to_owned(),
            project: "test-proj".to_owned(),
            organization: ORG.to_owned(),
        }
    }

    #[tokio::test]
    async fn errors_when_referenced_project_is_missing() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(ClientKey {
                metadata: meta("sentry-key-1"),
                spec: key_spec("proj-not-found"),
                status: None,
            })
            .unwrap();

        let err = client_key::reconcile(&ctx, NS, "sentry-key-1").await.unwrap_err();
        assert!(matches!(err, Error::Dependency { kind: "Project", .. }));
        assert!(fake.client_keys().is_empty());
    }

    #[tokio::test]
    async fn creates_upstream_key_and_projects_secret() {
        let fake = fake_with_org();
        fake.add_project("test-proj", "Proj");
        let ctx = test_context(&fake);
        ctx.store.seed(adopted_project("proj", "test-proj")).unwrap();
        ctx.store
            .seed(ClientKey {
                metadata: meta("sentry-key-1"),
                spec: key_spec("proj"),
                status: None,
            })
            .unwrap();

        client_key::reconcile(&ctx, NS, "sentry-key-1").await.unwrap();

        let keys = fake.client_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].id, "1");
        assert_eq!(keys[0].name, "My Key");

        let stored: ClientKey = ctx.store.get(NS, "sentry-key-1").await.unwrap().unwrap();
        assert_eq!(
            stored.metadata.finalizers,
            Some(vec![finalizer::FINALIZER.to_owned()])
        );
        let status = stored.status.unwrap();
        assert_eq!(status.id, "1");
        assert_eq!(status.project, "test-proj");
        assert_eq!(status.organization, ORG);

        let secret: Secret = ctx.store.get(NS, "sentry-key-1").await.unwrap().unwrap();
        let data = secret.data.unwrap();
        assert_eq!(data["dsn.public"], ByteString(b"public".to_vec()));
        assert_eq!(data["dsn.secret"], ByteString(b"secret".to_vec()));
        assert_eq!(data["dsn.csp"], ByteString(b"csp".to_vec()));

        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "ClientKey");
        assert_eq!(owners[0].name, "sentry-key-1");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[tokio::test]
    async fn second_reconcile_creates_no_key_and_writes_no_secret() {
        let fake = fake_with_org();
        fake.add_project("test-proj", "Proj");
        let ctx = test_context(&fake);
        ctx.store.seed(adopted_project("proj", "test-proj")).unwrap();
        ctx.store
            .seed(ClientKey {
                metadata: meta("sentry-key-1"),
                spec: key_spec("proj"),
                status: None,
            })
            .unwrap();

        client_key::reconcile(&ctx, NS, "sentry-key-1").await.unwrap();
        let secret_writes = ctx.store.writes::<Secret>();
        assert_eq!(secret_writes, 1);

        client_key::reconcile(&ctx, NS, "sentry-key-1").await.unwrap();

        assert_eq!(fake.client_keys().len(), 1);
        assert_eq!(ctx.store.writes::<Secret>(), secret_writes);
    }

    #[tokio::test]
    async fn errors_when_recorded_key_vanished_upstream() {
        let fake = fake_with_org();
        fake.add_project("test-proj", "Proj");
        let ctx = test_context(&fake);
        ctx.store.seed(adopted_project("proj", "test-proj")).unwrap();
        ctx.store
            .seed(ClientKey {
                metadata: meta("sentry-key-1"),
                spec: key_spec("proj"),
                status: Some(adopted_status("7")),
            })
            .unwrap();

        let err = client_key::reconcile(&ctx, NS, "sentry-key-1").await.unwrap_err();
        assert!(matches!(err, Error::KeyVanished { .. }));
        // Not healed by recreation.
        assert!(fake.client_keys().is_empty());
    }

    #[tokio::test]
    async fn renames_upstream_key_and_overwrites_drifted_secret() {
        let fake = fake_with_org();
        fake.add_project("test-proj", "Proj");
        fake.add_client_key(sentry::ClientKey {
            id: "1".to_owned(),
            name: "old key name".to_owned(),
            dsn: dsn("new public", "new secret", "new csp"),
        });
        let ctx = test_context(&fake);
        ctx.store.seed(adopted_project("proj", "test-proj")).unwrap();
        ctx.store
            .seed(ClientKey {
                metadata: meta("test-key"),
                spec: ClientKeySpec {
                    name: "new key name".to_owned(),
                    project_ref: ObjectRef {
                        name: "proj".to_owned(),
                        namespace: None,
                    },
                },
                status: Some(adopted_status("1")),
            })
            .unwrap();
        ctx.store
            .seed(Secret {
                metadata: ObjectMeta {
                    namespace: Some(NS.to_owned()),
                    name: Some("test-key".to_owned()),
                    ..ObjectMeta::default()
                },
                data: Some(
                    [
                        ("dsn.public".to_owned(), ByteString(b"public".to_vec())),
                        ("dsn.secret".to_owned(), ByteString(b"secret".to_vec())),
                        ("dsn.csp".to_owned(), ByteString(b"csp".to_vec())),
                    ]
                    .into(),
                ),
                ..Secret::default()
            })
            .unwrap();

        client_key::reconcile(&ctx, NS, "test-key").await.unwrap();

        assert_eq!(fake.client_keys()[0].name, "new key name");

        let secret: Secret = ctx.store.get(NS, "test-key").await.unwrap().unwrap();
        let data = secret.data.unwrap();
        assert_eq!(data["dsn.public"], ByteString(b"new public".to_vec()));
        assert_eq!(data["dsn.secret"], ByteString(b"new secret".to_vec()));
        assert_eq!(data["dsn.csp"], ByteString(b"new csp".to_vec()));
    }

    #[tokio::test]
    async fn deletion_removes_upstream_key_and_finalizer() {
        let fake = fake_with_org();
        fake.add_project("test-proj", "Proj");
        fake.add_client_key(sentry::ClientKey {
            id: "1".to_owned(),
            name: "key name".to_owned(),
            dsn: dsn("public", "secret", "csp"),
        });
        fake.add_client_key(sentry::ClientKey {
            id: "2".to_owned(),
            name: "some other key".to_owned(),
            dsn: dsn("public", "secret", "csp"),
        });
        let ctx = test_context(&fake);
        ctx.store
            .seed(ClientKey {
                metadata: deleted_meta("test-key"),
                spec: key_spec("proj"),
                status: Some(adopted_status("1")),
            })
            .unwrap();

        client_key::reconcile(&ctx, NS, "test-key").await.unwrap();

        let ids: Vec<_> = fake.client_keys().into_iter().map(|k| k.id).collect();
        assert_eq!(ids, vec!["2".to_owned()]);

        let stored: ClientKey = ctx.store.get(NS, "test-key").await.unwrap().unwrap();
        assert_eq!(stored.metadata.finalizers, None);
        assert!(stored.status.is_none());
    }

    #[tokio::test]
    async fn deletion_completes_when_upstream_key_is_already_gone() {
        let fake = fake_with_org();
        let ctx = test_context(&fake);
        ctx.store
            .seed(ClientKey {
                metadata: deleted_meta("test-key"),
                spec: key_spec("proj"),
                status: Some(adopted_status("1")),
            })
            .unwrap();

        client_key::reconcile(&ctx, NS, "test-key").await.unwrap();

        let stored: ClientKey = ctx.store.get(NS, "test-key").await.unwrap().unwrap();
        assert_eq!(stored.metadata.finalizers, None);
    }

    #[tokio::test]
    async fn deletion_failure_keeps_finalizer_and_status() {
        let fake = fake_with_org();
        fake.add_project("test-proj", "Proj");
        fake.add_client_key(sentry::ClientKey {
            id: "1".to_owned(),
            name: "key name".to_owned(),
            dsn: dsn("public", "secret", "csp"),
        });
        fake.fail_deletes(500);
        let ctx = test_context(&fake);
        ctx.store
            .seed(ClientKey {
                metadata: deleted_meta("test-key"),
                spec: key_spec("proj"),
                status: Some(adopted_status("1")),
            })
            .unwrap();

        let err = client_key::reconcile(&ctx, NS, "test-key").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));

        let stored: ClientKey = ctx.store.get(NS, "test-key").await.unwrap().unwrap();
        assert_eq!(
            stored.metadata.finalizers,
            Some(vec![finalizer::FINALIZER.to_owned()])
        );
        assert_eq!(stored.observed_id(), "1");
        assert_eq!(fake.client_keys().len(), 1);
    }
}
