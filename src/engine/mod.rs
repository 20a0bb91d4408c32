mod feed_api;
mod helpers;
mod job_api;
mod member_api;
mod pricing_api;
mod session_api;

use std::sync::Arc;
use std::time::Duration;

use oso::Oso;

use crate::{
    api::API,
    auth::{authorizor, password},
    db::Store,
    entities::{member::normalize_email, Job, Member, Registration, Role},
    error::{unauthorized_error, Error},
    feed::{JobEvent, JobFeed},
};

pub struct Engine {
    store: Arc<dyn Store>,
    authorizor: Oso,
    feed: JobFeed,
    session_ttl: chrono::Duration,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(
        store: Arc<dyn Store>,
        session_ttl: chrono::Duration,
        feed_poll_interval: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            store,
            authorizor: authorizor::new()?,
            feed: JobFeed::new(feed_poll_interval),
            session_ttl,
        })
    }

    /// Makes sure an administrator account exists for `email`. Admins cannot
    /// register themselves, so this is the only way one is created.
    #[tracing::instrument(skip(self, password))]
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<Member, Error> {
        if let Some(existing) = self.store.find_member_by_email(&normalize_email(email)).await? {
            if existing.role != Role::Admin {
                tracing::warn!("seed email belongs to a non-admin member");
                return Err(unauthorized_error());
            }

            return Ok(existing);
        }

        let registration = Registration {
            email: email.into(),
            name: "Administrator".into(),
            password: password.into(),
            role: Role::Admin,
            company: None,
        };

        let password_hash = password::hash_password(&registration.password)?;
        let admin = Member::new(&registration, password_hash)?;

        self.store.insert_member(&admin).await?;

        tracing::info!(member_id = %admin.id, "seeded administrator");

        Ok(admin)
    }
}

impl Engine {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(unauthorized_error())
    }

    /// Persists a changed job and tells subscribers about it.
    async fn commit_job(&self, job: &mut Job) -> Result<(), Error> {
        self.store.update_job(job).await?;
        self.feed.publish(JobEvent::updated(job));

        Ok(())
    }
}

impl API for Engine {}

#[test]
fn seeding_the_admin_is_idempotent() {
    use crate::db::MemoryStore;
    use tokio_test::block_on;

    let engine = Engine::new(
        Arc::new(MemoryStore::new()),
        chrono::Duration::hours(1),
        Duration::from_secs(5),
    )
    .unwrap();

    let first = block_on(engine.seed_admin("admin@example.com", "admin-password")).unwrap();
    let second = block_on(engine.seed_admin("Admin@Example.com", "admin-password")).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.role, Role::Admin);
}
