mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Job, LedgerEntry, Member, Session};
use crate::error::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobFilter {
    All,
    RequestedBy(Uuid),
    /// Open jobs plus the ones assigned to this driver.
    VisibleToDriver(Uuid),
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            Self::All => true,
            Self::RequestedBy(id) => job.requester_id == *id,
            Self::VisibleToDriver(id) => job.is_open() || job.driver_id == Some(*id),
        }
    }
}

/// Persistence for the engine. Jobs and members are versioned: updates only
/// write when the stored version still matches the caller's copy.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_job(&self, job: &Job) -> Result<(), Error>;
    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, Error>;
    /// Newest first.
    async fn list_jobs(&self, filter: JobFilter) -> Result<Vec<Job>, Error>;
    /// Bumps `job.version` on success; fails with a conflict error when the
    /// stored job moved on.
    async fn update_job(&self, job: &mut Job) -> Result<(), Error>;

    /// Fails with an invalid input error when the email is taken.
    async fn insert_member(&self, member: &Member) -> Result<(), Error>;
    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, Error>;
    async fn find_member_by_email(&self, email: &str) -> Result<Option<Member>, Error>;
    /// Bumps `member.version` on success; fails with a conflict error when
    /// the stored member moved on.
    async fn update_member(&self, member: &mut Member) -> Result<(), Error>;
    /// Applies a money movement to the latest stored member without lost
    /// updates; returns the amount moved.
    async fn apply_ledger(&self, id: Uuid, entry: LedgerEntry) -> Result<f64, Error>;

    async fn insert_session(&self, session: &Session) -> Result<(), Error>;
    async fn find_session(&self, token: Uuid) -> Result<Option<Session>, Error>;
    async fn delete_session(&self, token: Uuid) -> Result<bool, Error>;

    async fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>, Error>;
    async fn save_setting(&self, key: &str, value: serde_json::Value) -> Result<(), Error>;
}
