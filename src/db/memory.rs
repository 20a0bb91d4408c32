use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{JobFilter, Store};
use crate::entities::{Job, LedgerEntry, Member, Session};
use crate::error::{conflict_error, invalid_field_error, not_found_error, Error};

#[derive(Default)]
struct State {
    jobs: HashMap<Uuid, Job>,
    members: HashMap<Uuid, Member>,
    sessions: HashMap<Uuid, Session>,
    settings: HashMap<String, serde_json::Value>,
}

/// Process-local store for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_job(&self, job: &Job) -> Result<(), Error> {
        let mut state = self.state.write().await;

        if state.jobs.contains_key(&job.id) {
            return Err(invalid_field_error("id"));
        }

        state.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, Error> {
        Ok(self.state.read().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, filter: JobFilter) -> Result<Vec<Job>, Error> {
        let state = self.state.read().await;

        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(jobs)
    }

    async fn update_job(&self, job: &mut Job) -> Result<(), Error> {
        let mut state = self.state.write().await;

        let stored = state.jobs.get_mut(&job.id).ok_or_else(not_found_error)?;

        if stored.version != job.version {
            tracing::warn!(job_id = %job.id, "stale job version {} (stored {})", job.version, stored.version);
            return Err(conflict_error());
        }

        job.version += 1;
        *stored = job.clone();

        Ok(())
    }

    async fn insert_member(&self, member: &Member) -> Result<(), Error> {
        let mut state = self.state.write().await;

        if state.members.values().any(|m| m.email == member.email) {
            return Err(invalid_field_error("email"));
        }

        state.members.insert(member.id, member.clone());
        Ok(())
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, Error> {
        Ok(self.state.read().await.members.get(&id).cloned())
    }

    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, Error> {
        let state = self.state.read().await;

        Ok(state.members.values().find(|m| m.email == email).cloned())
    }

    async fn update_member(&self, member: &mut Member) -> Result<(), Error> {
        let mut state = self.state.write().await;

        let stored = state.members.get_mut(&member.id).ok_or_else(not_found_error)?;

        if stored.version != member.version {
            tracing::warn!(member_id = %member.id, "stale member version {} (stored {})", member.version, stored.version);
            return Err(conflict_error());
        }

        member.version += 1;
        *stored = member.clone();

        Ok(())
    }

    async fn apply_ledger(&self, id: Uuid, entry: LedgerEntry) -> Result<f64, Error> {
        let mut state = self.state.write().await;

        let stored = state.members.get_mut(&id).ok_or_else(not_found_error)?;

        let mut member = stored.clone();
        let amount = member.apply_ledger(entry)?;
        member.version += 1;
        *stored = member;

        Ok(amount)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), Error> {
        let mut state = self.state.write().await;
        state.sessions.insert(session.token, session.clone());

        Ok(())
    }

    async fn find_session(&self, token: Uuid) -> Result<Option<Session>, Error> {
        Ok(self.state.read().await.sessions.get(&token).cloned())
    }

    async fn delete_session(&self, token: Uuid) -> Result<bool, Error> {
        Ok(self.state.write().await.sessions.remove(&token).is_some())
    }

    async fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>, Error> {
        Ok(self.state.read().await.settings.get(key).cloned())
    }

    async fn save_setting(&self, key: &str, value: serde_json::Value) -> Result<(), Error> {
        let mut state = self.state.write().await;
        state.settings.insert(key.to_string(), value);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{job::test_request, BookingType};

    #[tokio::test]
    async fn stale_job_writes_are_rejected() {
        let store = MemoryStore::new();
        let job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();
        store.insert_job(&job).await.unwrap();

        let mut first = store.find_job(job.id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.passengers = 3;
        store.update_job(&mut first).await.unwrap();
        assert_eq!(first.version, 1);

        second.passengers = 4;
        let err = store.update_job(&mut second).await.unwrap_err();
        assert!(err.is_conflict_error());
        assert_eq!(second.version, 0);

        let stored = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.passengers, 3);
    }

    #[tokio::test]
    async fn driver_filter_sees_open_and_assigned_jobs() {
        use crate::entities::Bid;

        let store = MemoryStore::new();
        let driver_id = Uuid::new_v4();

        let open = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();
        let mut assigned = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();
        let mut taken = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();

        let bid = Bid::new(driver_id, 20.0, "Car".into(), "Economy".into(), None);
        let bid_id = bid.id;
        assigned.place_bid(bid).unwrap();
        assigned.accept_bid(bid_id).unwrap();

        let bid = Bid::new(Uuid::new_v4(), 20.0, "Car".into(), "Economy".into(), None);
        let bid_id = bid.id;
        taken.place_bid(bid).unwrap();
        taken.accept_bid(bid_id).unwrap();

        for job in [&open, &assigned, &taken] {
            store.insert_job(job).await.unwrap();
        }

        let visible = store.list_jobs(JobFilter::VisibleToDriver(driver_id)).await.unwrap();
        let mut ids: Vec<Uuid> = visible.iter().map(|job| job.id).collect();
        ids.sort();

        let mut expected = vec![open.id, assigned.id];
        expected.sort();

        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn ledger_credits_invalidate_stale_member_copies() {
        use crate::entities::{Account, Profile, Registration, Role};

        let store = MemoryStore::new();
        let registration = Registration {
            email: "driver@example.com".into(),
            name: "Driver".into(),
            password: "secret-password".into(),
            role: Role::Driver,
            company: None,
        };
        let driver = Member::new(&registration, "hash".into()).unwrap();
        store.insert_member(&driver).await.unwrap();

        let mut stale = store.find_member(driver.id).await.unwrap().unwrap();

        let credit = LedgerEntry::Credit {
            account: Account::Earnings,
            amount: 25.5,
        };
        assert_eq!(store.apply_ledger(driver.id, credit).await.unwrap(), 25.5);

        stale.name = "Renamed".into();
        let err = store.update_member(&mut stale).await.unwrap_err();
        assert!(err.is_conflict_error());

        let stored = store.find_member(driver.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        match stored.profile {
            Profile::Driver { earnings, .. } => assert_eq!(earnings, 25.5),
            _ => unreachable!(),
        }
    }
}
