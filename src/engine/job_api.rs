use super::helpers::{fetch_job, fetch_member, load_pricing_config};
use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::JobAPI,
    auth::{Platform, User},
    db::JobFilter,
    entities::{Bid, Job, JobChanges, JobRequest, Party, Resolution, Role, Stage},
    error::{invalid_field_error, unauthorized_error, Error},
    feed::JobEvent,
    pricing,
};

#[async_trait]
impl JobAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_jobs(&self, user: User) -> Result<Vec<Job>, Error> {
        let sees_everything = self
            .authorize(user.clone(), "list_all_jobs", Platform::default())
            .is_ok();

        let filter = if sees_everything {
            JobFilter::All
        } else if user.has_role(Role::Driver.name()) {
            JobFilter::VisibleToDriver(user.id)
        } else {
            JobFilter::RequestedBy(user.id)
        };

        self.store.list_jobs(filter).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_job(&self, user: User, id: Uuid) -> Result<Job, Error> {
        let job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user, "read", job.clone())?;

        Ok(job)
    }

    #[tracing::instrument(skip(self, request))]
    async fn create_job(&self, user: User, request: JobRequest) -> Result<Job, Error> {
        self.authorize(user.clone(), "create_job", Platform::default())?;

        if request.guest.is_some() {
            self.authorize(user.clone(), "book_for_guest", Platform::default())?;
        }

        let config = load_pricing_config(self.store.as_ref()).await?;
        let estimate = pricing::estimate(config.as_ref(), &request);

        let job = Job::new(user.id, request, estimate)?;

        self.store.insert_job(&job).await?;
        self.feed.publish(JobEvent::created(&job));

        tracing::info!(job_id = %job.id, ?estimate, "job created");

        Ok(job)
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update_job(&self, user: User, id: Uuid, changes: JobChanges) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user, "update", job.clone())?;

        let reprice = !changes.only_extras();
        job.apply_changes(changes)?;

        if reprice {
            let config = load_pricing_config(self.store.as_ref()).await?;
            job.estimate = pricing::estimate(config.as_ref(), &job.as_request());
        }

        self.commit_job(&mut job).await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn place_bid(
        &self,
        user: User,
        id: Uuid,
        vehicle_id: Uuid,
        amount: f64,
    ) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user.clone(), "bid", job.clone())?;

        let driver = fetch_member(self.store.as_ref(), user.id).await?;

        if !driver.is_active() {
            tracing::info!("driver is not verified, refusing bid");
            return Err(unauthorized_error());
        }

        let vehicle = driver
            .find_vehicle(vehicle_id)
            .ok_or_else(|| invalid_field_error("vehicle_id"))?;

        let bid = Bid::new(
            driver.id,
            amount,
            vehicle.describe(),
            vehicle.vehicle_type.clone(),
            driver.rating(),
        );

        job.place_bid(bid)?;
        self.commit_job(&mut job).await?;

        tracing::info!(bids = job.bids.len(), "bid placed");

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn accept_bid(&self, user: User, id: Uuid, bid_id: Uuid) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user, "accept_bid", job.clone())?;

        let bid = job.accept_bid(bid_id)?;
        self.commit_job(&mut job).await?;

        tracing::info!(driver_id = %bid.driver_id, price = bid.amount, "bid accepted");

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn update_job_status(&self, user: User, id: Uuid, stage: Stage) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user, "advance", job.clone())?;

        job.advance(stage)?;

        let credits = match stage {
            Stage::Completed => self.settle(&mut job).await?,
            _ => vec![],
        };

        self.commit_job(&mut job).await?;

        tracing::info!("job moved to {}", job.status.name());

        self.apply_credits(&credits).await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_job(&self, user: User, id: Uuid, reason: Option<String>) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user.clone(), "cancel", job.clone())?;

        let by = if user.is_admin() {
            Party::Admin
        } else {
            job.party_of(user.id).ok_or_else(unauthorized_error)?
        };

        let reversals = job.cancel(by, reason)?;
        self.commit_job(&mut job).await?;

        tracing::info!(?by, reversals = reversals.len(), "job cancelled");

        self.apply_credits(&reversals).await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn reject_job(&self, user: User, id: Uuid, reason: Option<String>) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user, "reject", job.clone())?;

        job.reject(reason)?;
        self.commit_job(&mut job).await?;

        tracing::info!("job rejected");

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn dispute_job(&self, user: User, id: Uuid, reason: String) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user.clone(), "dispute", job.clone())?;

        let raised_by = job.party_of(user.id).ok_or_else(unauthorized_error)?;

        job.dispute(raised_by, reason)?;
        self.commit_job(&mut job).await?;

        tracing::info!(?raised_by, "job disputed");

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    async fn resolve_dispute(
        &self,
        user: User,
        id: Uuid,
        resolution: Resolution,
    ) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user, "resolve", job.clone())?;

        job.resolve(resolution)?;

        let credits = self.settle(&mut job).await?;
        self.commit_job(&mut job).await?;

        tracing::info!(?resolution, "dispute resolved");

        self.apply_credits(&credits).await?;

        Ok(job)
    }

    #[tracing::instrument(skip(self, body))]
    async fn post_message(&self, user: User, id: Uuid, body: String) -> Result<Job, Error> {
        let mut job = fetch_job(self.store.as_ref(), id).await?;

        self.authorize(user.clone(), "message", job.clone())?;

        job.post_message(user.id, body)?;
        self.commit_job(&mut job).await?;

        Ok(job)
    }
}
