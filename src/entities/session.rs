use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::member::Role;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: Uuid,
    pub member_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(member_id: Uuid, role: Role, ttl: Duration) -> Self {
        let created_at = Utc::now();

        Self {
            token: Uuid::new_v4(),
            member_id,
            role,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[test]
fn session_expires_after_ttl() {
    let session = Session::new(Uuid::new_v4(), Role::Client, Duration::hours(1));
    assert!(!session.is_expired());

    let session = Session::new(Uuid::new_v4(), Role::Client, Duration::seconds(-1));
    assert!(session.is_expired());
}
