use super::Engine;

use async_trait::async_trait;

use crate::{
    api::{FeedAPI, FeedUpdate, JobAPI},
    auth::User,
    error::Error,
    feed::{Delivery, Subscription},
};

#[async_trait]
impl FeedAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn subscribe(&self, _user: User) -> Result<Subscription, Error> {
        tracing::info!("feed subscription opened");

        Ok(self.feed.subscribe())
    }

    #[tracing::instrument(skip(self, subscription))]
    async fn next_update(
        &self,
        user: User,
        subscription: &mut Subscription,
    ) -> Result<Option<FeedUpdate>, Error> {
        loop {
            match subscription.recv().await {
                Delivery::Event(event) => {
                    if self.authorize(user.clone(), "read", event.job.clone()).is_ok() {
                        return Ok(Some(FeedUpdate::Job(event.job)));
                    }
                }
                Delivery::Resync => {
                    let jobs = self.list_jobs(user.clone()).await?;
                    return Ok(Some(FeedUpdate::Snapshot(jobs)));
                }
                Delivery::Closed => return Ok(None),
            }
        }
    }
}
