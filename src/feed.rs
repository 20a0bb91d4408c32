//! Job update feed.
//!
//! Every persisted job change is broadcast to all subscribers. A subscriber
//! that falls behind, or that hears nothing within its poll interval, is told
//! to resync, i.e. re-read a snapshot from the store. Dropping a
//! [`Subscription`] unsubscribes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::entities::Job;

pub const FEED_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Created,
    Updated,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub kind: JobEventKind,
    pub job: Job,
}

impl JobEvent {
    pub fn created(job: &Job) -> Self {
        Self {
            kind: JobEventKind::Created,
            job: job.clone(),
        }
    }

    pub fn updated(job: &Job) -> Self {
        Self {
            kind: JobEventKind::Updated,
            job: job.clone(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Delivery {
    Event(JobEvent),
    Resync,
    Closed,
}

#[derive(Clone)]
pub struct JobFeed {
    sender: broadcast::Sender<JobEvent>,
    poll_interval: Duration,
}

impl JobFeed {
    pub fn new(poll_interval: Duration) -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);

        Self {
            sender,
            poll_interval,
        }
    }

    pub fn publish(&self, event: JobEvent) {
        // nobody listening is fine
        if let Ok(receivers) = self.sender.send(event) {
            tracing::debug!("job event delivered to {} subscribers", receivers);
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            poll_interval: self.poll_interval,
        }
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<JobEvent>,
    poll_interval: Duration,
}

impl Subscription {
    pub async fn recv(&mut self) -> Delivery {
        match tokio::time::timeout(self.poll_interval, self.receiver.recv()).await {
            Ok(Ok(event)) => Delivery::Event(event),
            Ok(Err(RecvError::Lagged(skipped))) => {
                tracing::warn!("subscriber lagged behind by {} job events", skipped);
                Delivery::Resync
            }
            Ok(Err(RecvError::Closed)) => Delivery::Closed,
            Err(_) => Delivery::Resync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{job::test_request, BookingType};
    use tokio_test::block_on;
    use uuid::Uuid;

    fn job() -> Job {
        Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap()
    }

    #[test]
    fn subscribers_receive_published_events() {
        let feed = JobFeed::new(Duration::from_secs(5));
        let mut subscription = feed.subscribe();
        let job = job();

        feed.publish(JobEvent::created(&job));

        match block_on(subscription.recv()) {
            Delivery::Event(event) => {
                assert_eq!(event.kind, JobEventKind::Created);
                assert_eq!(event.job.id, job.id);
            }
            other => panic!("unexpected delivery {:?}", other),
        }
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let feed = JobFeed::new(Duration::from_secs(5));

        feed.publish(JobEvent::created(&job()));
    }

    #[test]
    fn quiet_feed_asks_for_resync() {
        let feed = JobFeed::new(Duration::from_millis(20));
        let mut subscription = feed.subscribe();

        assert_eq!(block_on(subscription.recv()), Delivery::Resync);
    }

    #[test]
    fn lagging_subscriber_is_resynced() {
        let feed = JobFeed::new(Duration::from_secs(5));
        let mut subscription = feed.subscribe();
        let job = job();

        for _ in 0..FEED_CAPACITY + 10 {
            feed.publish(JobEvent::updated(&job));
        }

        assert_eq!(block_on(subscription.recv()), Delivery::Resync);
        assert!(matches!(block_on(subscription.recv()), Delivery::Event(_)));
    }

    #[test]
    fn dropped_feed_closes_subscriptions() {
        let feed = JobFeed::new(Duration::from_secs(5));
        let mut subscription = feed.subscribe();
        drop(feed);

        assert_eq!(block_on(subscription.recv()), Delivery::Closed);
    }
}
