use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::member::Status as MemberStatus;
use crate::entities::{
    DocumentKind, Job, JobChanges, JobRequest, Member, PricingConfig, PricingThresholds,
    Registration, Resolution, Session, Stage,
};
use crate::error::Error;
use crate::feed::Subscription;
use crate::offer::OfferFeedback;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub plate: String,
    pub vehicle_type: String,
    pub seats: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub member_id: Uuid,
    pub amount: f64,
}

/// What a feed consumer should apply next: a single changed job, or a full
/// snapshot replacing whatever it holds.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedUpdate {
    Job(Job),
    Snapshot(Vec<Job>),
}

#[async_trait]
pub trait SessionAPI {
    async fn register(&self, registration: Registration) -> Result<Member, Error>;
    async fn login(&self, email: String, password: String) -> Result<Session, Error>;
    async fn logout(&self, token: Uuid) -> Result<(), Error>;
    async fn authenticate(&self, token: Uuid) -> Result<User, Error>;
}

#[async_trait]
pub trait MemberAPI {
    async fn find_member(&self, user: User, id: Uuid) -> Result<Member, Error>;
    async fn add_vehicle(&self, user: User, id: Uuid, vehicle: NewVehicle) -> Result<Member, Error>;
    async fn submit_document(
        &self,
        user: User,
        id: Uuid,
        document: NewDocument,
    ) -> Result<Member, Error>;
    async fn review_document(
        &self,
        user: User,
        id: Uuid,
        document_id: Uuid,
        approved: bool,
    ) -> Result<Member, Error>;
    async fn set_member_status(
        &self,
        user: User,
        id: Uuid,
        status: MemberStatus,
    ) -> Result<Member, Error>;
    async fn payout(&self, user: User, id: Uuid) -> Result<Payout, Error>;
}

#[async_trait]
pub trait PricingAPI {
    /// `None` until an administrator saves a configuration.
    async fn get_pricing_config(&self, user: User) -> Result<Option<PricingConfig>, Error>;
    async fn update_pricing_config(
        &self,
        user: User,
        config: PricingConfig,
    ) -> Result<PricingConfig, Error>;
    async fn get_pricing_thresholds(&self, user: User) -> Result<PricingThresholds, Error>;
    async fn update_pricing_thresholds(
        &self,
        user: User,
        thresholds: PricingThresholds,
    ) -> Result<PricingThresholds, Error>;
    async fn calculate_price(
        &self,
        user: User,
        distance_km: f64,
        vehicle_type: String,
        pickup_at: DateTime<Utc>,
    ) -> Result<Option<f64>, Error>;
    async fn evaluate_offer(
        &self,
        user: User,
        job_id: Uuid,
        amount: f64,
    ) -> Result<Option<OfferFeedback>, Error>;
}

#[async_trait]
pub trait JobAPI {
    async fn list_jobs(&self, user: User) -> Result<Vec<Job>, Error>;
    async fn find_job(&self, user: User, id: Uuid) -> Result<Job, Error>;
    async fn create_job(&self, user: User, request: JobRequest) -> Result<Job, Error>;
    async fn update_job(&self, user: User, id: Uuid, changes: JobChanges) -> Result<Job, Error>;
    async fn place_bid(
        &self,
        user: User,
        id: Uuid,
        vehicle_id: Uuid,
        amount: f64,
    ) -> Result<Job, Error>;
    async fn accept_bid(&self, user: User, id: Uuid, bid_id: Uuid) -> Result<Job, Error>;
    async fn update_job_status(&self, user: User, id: Uuid, stage: Stage) -> Result<Job, Error>;
    async fn cancel_job(&self, user: User, id: Uuid, reason: Option<String>) -> Result<Job, Error>;
    async fn reject_job(&self, user: User, id: Uuid, reason: Option<String>) -> Result<Job, Error>;
    async fn dispute_job(&self, user: User, id: Uuid, reason: String) -> Result<Job, Error>;
    async fn resolve_dispute(
        &self,
        user: User,
        id: Uuid,
        resolution: Resolution,
    ) -> Result<Job, Error>;
    async fn post_message(&self, user: User, id: Uuid, body: String) -> Result<Job, Error>;
}

#[async_trait]
pub trait FeedAPI {
    async fn subscribe(&self, user: User) -> Result<Subscription, Error>;
    /// Waits for the next update `user` may see. `None` once the feed is
    /// closed.
    async fn next_update(
        &self,
        user: User,
        subscription: &mut Subscription,
    ) -> Result<Option<FeedUpdate>, Error>;
}

pub trait API: SessionAPI + MemberAPI + PricingAPI + JobAPI + FeedAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
