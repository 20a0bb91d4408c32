use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::member::{round_cents, Account, LedgerEntry};
use crate::entities::{Bid, Place};
use crate::error::{invalid_field_error, invalid_input_error, invalid_invocation_error, Error};

const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingType {
    Distance,
    Hourly,
    Delivery,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extras {
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub name_sign: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// The traveller an agency books for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Client,
    Driver,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    Refund,
    PayDriver,
    Split,
}

/// Money moved to a member because this job settled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub member_id: Uuid,
    pub account: Account,
    pub amount: f64,
}

impl Credit {
    pub fn new(member_id: Uuid, account: Account, amount: f64) -> Self {
        Self {
            member_id,
            account,
            amount,
        }
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.member_id, self.account, -self.amount)
    }

    pub fn entry(&self) -> LedgerEntry {
        LedgerEntry::Credit {
            account: self.account,
            amount: self.amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted {
        bid_id: Uuid,
        at: DateTime<Utc>,
    },
    DriverEnRoute {
        at: DateTime<Utc>,
    },
    DriverArrived {
        at: DateTime<Utc>,
    },
    InProgress {
        at: DateTime<Utc>,
    },
    Completed {
        at: DateTime<Utc>,
    },
    Cancelled {
        by: Party,
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    Rejected {
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    Disputed {
        raised_by: Party,
        reason: String,
        at: DateTime<Utc>,
        resolution: Option<Resolution>,
    },
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "PENDING".into(),
            Self::Accepted { .. } => "ACCEPTED".into(),
            Self::DriverEnRoute { .. } => "DRIVER_EN_ROUTE".into(),
            Self::DriverArrived { .. } => "DRIVER_ARRIVED".into(),
            Self::InProgress { .. } => "IN_PROGRESS".into(),
            Self::Completed { .. } => "COMPLETED".into(),
            Self::Cancelled { .. } => "CANCELLED".into(),
            Self::Rejected { .. } => "REJECTED".into(),
            Self::Disputed { .. } => "DISPUTED".into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Completed { .. } | Self::Cancelled { .. } | Self::Rejected { .. } => true,
            Self::Disputed { resolution, .. } => resolution.is_some(),
            _ => false,
        }
    }
}

/// Steps a driver walks through once a bid has been accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    DriverEnRoute,
    DriverArrived,
    InProgress,
    Completed,
}

/// What clients see. `Bidding` is never stored: it is a pending job that
/// already has offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayStatus {
    Pending,
    Bidding,
    Accepted,
    DriverEnRoute,
    DriverArrived,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
    Disputed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub pickup: Place,
    #[serde(default)]
    pub dropoff: Option<Place>,
    #[serde(default)]
    pub stops: Vec<Place>,
    pub scheduled_at: DateTime<Utc>,
    pub booking_type: BookingType,
    #[serde(default)]
    pub hours: Option<u32>,
    pub passengers: u32,
    #[serde(default)]
    pub luggage: u32,
    #[serde(default)]
    pub distance_km: Option<f64>,
    pub vehicle_type: String,
    #[serde(default)]
    pub extras: Extras,
    #[serde(default)]
    pub guest: Option<Guest>,
}

impl JobRequest {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.pickup.is_valid() {
            return Err(invalid_field_error("pickup"));
        }

        if let Some(dropoff) = &self.dropoff {
            if !dropoff.is_valid() {
                return Err(invalid_field_error("dropoff"));
            }
        }

        if self.stops.iter().any(|stop| !stop.is_valid()) {
            return Err(invalid_field_error("stops"));
        }

        match self.booking_type {
            BookingType::Distance | BookingType::Delivery => {
                if self.dropoff.is_none() {
                    return Err(invalid_field_error("dropoff"));
                }
            }
            BookingType::Hourly => {
                if self.hours.unwrap_or(0) == 0 {
                    return Err(invalid_field_error("hours"));
                }
            }
        }

        if self.passengers == 0 {
            return Err(invalid_field_error("passengers"));
        }

        if let Some(distance_km) = self.distance_km {
            if !distance_km.is_finite() || distance_km < 0.0 {
                return Err(invalid_field_error("distance_km"));
            }
        }

        if self.vehicle_type.trim().is_empty() {
            return Err(invalid_field_error("vehicle_type"));
        }

        if let Some(guest) = &self.guest {
            if guest.name.trim().is_empty() {
                return Err(invalid_field_error("guest"));
            }
        }

        Ok(())
    }
}

/// Partial edit of a pending job. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobChanges {
    #[serde(default)]
    pub pickup: Option<Place>,
    #[serde(default)]
    pub dropoff: Option<Place>,
    #[serde(default)]
    pub stops: Option<Vec<Place>>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hours: Option<u32>,
    #[serde(default)]
    pub passengers: Option<u32>,
    #[serde(default)]
    pub luggage: Option<u32>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub extras: Option<Extras>,
}

impl JobChanges {
    /// True when the edit only touches free-text extras.
    pub fn only_extras(&self) -> bool {
        self.pickup.is_none()
            && self.dropoff.is_none()
            && self.stops.is_none()
            && self.scheduled_at.is_none()
            && self.hours.is_none()
            && self.passengers.is_none()
            && self.luggage.is_none()
            && self.distance_km.is_none()
            && self.vehicle_type.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub guest: Option<Guest>,
    pub pickup: Place,
    pub dropoff: Option<Place>,
    pub stops: Vec<Place>,
    pub scheduled_at: DateTime<Utc>,
    pub booking_type: BookingType,
    pub hours: Option<u32>,
    pub passengers: u32,
    pub luggage: u32,
    pub distance_km: Option<f64>,
    pub vehicle_type: String,
    pub estimate: Option<f64>,
    pub status: Status,
    pub bids: Vec<Bid>,
    pub driver_id: Option<Uuid>,
    pub price: Option<f64>,
    pub extras: Extras,
    pub messages: Vec<Message>,
    /// Every ledger movement made for this job, reversals included.
    #[serde(default)]
    pub settlement: Vec<Credit>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl PolarClass for Job {
    fn get_polar_class_builder() -> oso::ClassBuilder<Job> {
        oso::Class::builder()
            .name("Job")
            .add_attribute_getter("id", |recv: &Job| recv.id)
            .add_attribute_getter("requester_id", |recv: &Job| recv.requester_id)
            .add_attribute_getter("driver_id", |recv: &Job| recv.driver_id)
            .add_attribute_getter("is_open", |recv: &Job| recv.is_open())
            .add_attribute_getter("is_terminal", |recv: &Job| recv.is_terminal())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Job::get_polar_class_builder();
        builder.build()
    }
}

impl Job {
    pub fn new(requester_id: Uuid, request: JobRequest, estimate: Option<f64>) -> Result<Self, Error> {
        request.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            requester_id,
            guest: request.guest,
            pickup: request.pickup,
            dropoff: request.dropoff,
            stops: request.stops,
            scheduled_at: request.scheduled_at,
            booking_type: request.booking_type,
            hours: request.hours,
            passengers: request.passengers,
            luggage: request.luggage,
            distance_km: request.distance_km,
            vehicle_type: request.vehicle_type,
            estimate,
            status: Status::Pending,
            bids: vec![],
            driver_id: None,
            price: None,
            extras: request.extras,
            messages: vec![],
            settlement: vec![],
            created_at: Utc::now(),
            version: 0,
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, Status::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn display_status(&self) -> DisplayStatus {
        match self.status {
            Status::Pending if !self.bids.is_empty() => DisplayStatus::Bidding,
            Status::Pending => DisplayStatus::Pending,
            Status::Accepted { .. } => DisplayStatus::Accepted,
            Status::DriverEnRoute { .. } => DisplayStatus::DriverEnRoute,
            Status::DriverArrived { .. } => DisplayStatus::DriverArrived,
            Status::InProgress { .. } => DisplayStatus::InProgress,
            Status::Completed { .. } => DisplayStatus::Completed,
            Status::Cancelled { .. } => DisplayStatus::Cancelled,
            Status::Rejected { .. } => DisplayStatus::Rejected,
            Status::Disputed { .. } => DisplayStatus::Disputed,
        }
    }

    /// Role of `member_id` on this job, if any.
    pub fn party_of(&self, member_id: Uuid) -> Option<Party> {
        if self.requester_id == member_id {
            return Some(Party::Client);
        }

        if self.driver_id == Some(member_id) {
            return Some(Party::Driver);
        }

        None
    }

    pub fn has_bid_from(&self, driver_id: Uuid) -> bool {
        self.bids.iter().any(|bid| bid.driver_id == driver_id)
    }

    pub fn find_bid(&self, bid_id: Uuid) -> Option<&Bid> {
        self.bids.iter().find(|bid| bid.id == bid_id)
    }

    /// The stage a driver may move the job to next, if any.
    pub fn next_stage(&self) -> Option<Stage> {
        match self.status {
            Status::Accepted { .. } => Some(Stage::DriverEnRoute),
            Status::DriverEnRoute { .. } => Some(Stage::DriverArrived),
            Status::DriverArrived { .. } => Some(Stage::InProgress),
            Status::InProgress { .. } => Some(Stage::Completed),
            _ => None,
        }
    }

    #[tracing::instrument(skip(self, bid), fields(job_id = %self.id))]
    pub fn place_bid(&mut self, bid: Bid) -> Result<(), Error> {
        if !self.is_open() {
            return Err(invalid_invocation_error());
        }

        if bid.driver_id == self.requester_id || self.has_bid_from(bid.driver_id) {
            return Err(invalid_invocation_error());
        }

        if !bid.amount.is_finite() || bid.amount <= 0.0 {
            return Err(invalid_field_error("amount"));
        }

        self.bids.push(bid);
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(job_id = %self.id))]
    pub fn accept_bid(&mut self, bid_id: Uuid) -> Result<Bid, Error> {
        if !self.is_open() {
            return Err(invalid_invocation_error());
        }

        let bid = self.find_bid(bid_id).cloned().ok_or_else(invalid_input_error)?;

        self.status = Status::Accepted {
            bid_id,
            at: Utc::now(),
        };
        self.driver_id = Some(bid.driver_id);
        self.price = Some(bid.amount);

        Ok(bid)
    }

    #[tracing::instrument(skip(self), fields(job_id = %self.id))]
    pub fn advance(&mut self, stage: Stage) -> Result<(), Error> {
        if self.next_stage() != Some(stage) {
            return Err(invalid_invocation_error());
        }

        let at = Utc::now();
        self.status = match stage {
            Stage::DriverEnRoute => Status::DriverEnRoute { at },
            Stage::DriverArrived => Status::DriverArrived { at },
            Stage::InProgress => Status::InProgress { at },
            Stage::Completed => Status::Completed { at },
        };

        Ok(())
    }

    /// Participants may cancel while the job is live; an admin may cancel
    /// from any state that is not already cancelled. Returns the reversals of
    /// any credits the job had already settled, which are also recorded.
    #[tracing::instrument(skip(self), fields(job_id = %self.id))]
    pub fn cancel(&mut self, by: Party, reason: Option<String>) -> Result<Vec<Credit>, Error> {
        let allowed = match (&self.status, by) {
            (Status::Cancelled { .. }, _) => false,
            (_, Party::Admin) => true,
            (status, _) => !status.is_terminal(),
        };

        if !allowed {
            return Err(invalid_invocation_error());
        }

        self.status = Status::Cancelled {
            by,
            reason,
            at: Utc::now(),
        };

        let reversals: Vec<Credit> = self.settlement.iter().map(Credit::reversed).collect();
        self.settlement.extend(reversals.iter().copied());

        Ok(reversals)
    }

    #[tracing::instrument(skip(self), fields(job_id = %self.id))]
    pub fn reject(&mut self, reason: Option<String>) -> Result<(), Error> {
        if self.is_terminal() {
            return Err(invalid_invocation_error());
        }

        self.status = Status::Rejected {
            reason,
            at: Utc::now(),
        };

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(job_id = %self.id))]
    pub fn dispute(&mut self, raised_by: Party, reason: String) -> Result<(), Error> {
        if self.is_terminal() || matches!(self.status, Status::Disputed { .. }) {
            return Err(invalid_invocation_error());
        }

        if reason.trim().is_empty() {
            return Err(invalid_field_error("reason"));
        }

        self.status = Status::Disputed {
            raised_by,
            reason,
            at: Utc::now(),
            resolution: None,
        };

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(job_id = %self.id))]
    pub fn resolve(&mut self, outcome: Resolution) -> Result<(), Error> {
        match &mut self.status {
            Status::Disputed { resolution, .. } if resolution.is_none() => {
                *resolution = Some(outcome);
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    /// Records what each side is owed now that the job has settled, given
    /// the driver's share of the agreed price after commission. Jobs that
    /// have not settled owe nothing.
    pub fn settle(&mut self, driver_share: f64) -> Vec<Credit> {
        let (driver_id, price) = match (self.driver_id, self.price) {
            (Some(driver_id), Some(price)) => (driver_id, price),
            _ => return vec![],
        };

        let earnings = |amount| Credit::new(driver_id, Account::Earnings, amount);
        let refund = |amount| Credit::new(self.requester_id, Account::Balance, amount);

        let credits = match &self.status {
            Status::Completed { .. } => vec![earnings(driver_share)],
            Status::Disputed {
                resolution: Some(resolution),
                ..
            } => match resolution {
                Resolution::Refund => vec![refund(price)],
                Resolution::PayDriver => vec![earnings(driver_share)],
                Resolution::Split => vec![
                    refund(round_cents(price / 2.0)),
                    earnings(round_cents(driver_share / 2.0)),
                ],
            },
            _ => vec![],
        };

        self.settlement.extend(credits.iter().copied());
        credits
    }

    pub fn post_message(&mut self, author_id: Uuid, body: String) -> Result<&Message, Error> {
        let body = body.trim().to_string();

        if body.is_empty() || body.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(invalid_field_error("body"));
        }

        self.messages.push(Message {
            id: Uuid::new_v4(),
            author_id,
            body,
            sent_at: Utc::now(),
        });

        // just pushed
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Applies an edit to a pending job. Once offers exist, only extras may
    /// change since drivers priced the trip as it was.
    pub fn apply_changes(&mut self, changes: JobChanges) -> Result<(), Error> {
        if !self.is_open() {
            return Err(invalid_invocation_error());
        }

        if !self.bids.is_empty() && !changes.only_extras() {
            return Err(invalid_invocation_error());
        }

        let mut request = self.as_request();

        if let Some(pickup) = changes.pickup {
            request.pickup = pickup;
        }
        if let Some(dropoff) = changes.dropoff {
            request.dropoff = Some(dropoff);
        }
        if let Some(stops) = changes.stops {
            request.stops = stops;
        }
        if let Some(scheduled_at) = changes.scheduled_at {
            request.scheduled_at = scheduled_at;
        }
        if let Some(hours) = changes.hours {
            request.hours = Some(hours);
        }
        if let Some(passengers) = changes.passengers {
            request.passengers = passengers;
        }
        if let Some(luggage) = changes.luggage {
            request.luggage = luggage;
        }
        if let Some(distance_km) = changes.distance_km {
            request.distance_km = Some(distance_km);
        }
        if let Some(vehicle_type) = changes.vehicle_type {
            request.vehicle_type = vehicle_type;
        }
        if let Some(extras) = changes.extras {
            request.extras = extras;
        }

        request.validate()?;

        self.pickup = request.pickup;
        self.dropoff = request.dropoff;
        self.stops = request.stops;
        self.scheduled_at = request.scheduled_at;
        self.hours = request.hours;
        self.passengers = request.passengers;
        self.luggage = request.luggage;
        self.distance_km = request.distance_km;
        self.vehicle_type = request.vehicle_type;
        self.extras = request.extras;

        Ok(())
    }

    pub fn as_request(&self) -> JobRequest {
        JobRequest {
            pickup: self.pickup.clone(),
            dropoff: self.dropoff.clone(),
            stops: self.stops.clone(),
            scheduled_at: self.scheduled_at,
            booking_type: self.booking_type,
            hours: self.hours,
            passengers: self.passengers,
            luggage: self.luggage,
            distance_km: self.distance_km,
            vehicle_type: self.vehicle_type.clone(),
            extras: self.extras.clone(),
            guest: self.guest.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_request(booking_type: BookingType) -> JobRequest {
    JobRequest {
        pickup: Place::new("Airport, Terminal 1"),
        dropoff: match booking_type {
            BookingType::Hourly => None,
            _ => Some(Place::new("Grand Hotel")),
        },
        stops: vec![],
        scheduled_at: Utc::now(),
        booking_type,
        hours: match booking_type {
            BookingType::Hourly => Some(3),
            _ => None,
        },
        passengers: 2,
        luggage: 1,
        distance_km: Some(12.0),
        vehicle_type: "Economy".into(),
        extras: Extras::default(),
        guest: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid_from(driver_id: Uuid, amount: f64) -> Bid {
        Bid::new(driver_id, amount, "Skoda Octavia".into(), "Economy".into(), Some(4.8))
    }

    fn accepted_job() -> (Job, Uuid) {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), Some(28.0)).unwrap();
        let driver_id = Uuid::new_v4();
        let bid = bid_from(driver_id, 30.0);
        let bid_id = bid.id;

        job.place_bid(bid).unwrap();
        job.accept_bid(bid_id).unwrap();

        (job, driver_id)
    }

    #[test]
    fn distance_booking_requires_dropoff() {
        let mut request = test_request(BookingType::Distance);
        request.dropoff = None;

        let err = Job::new(Uuid::new_v4(), request, None).unwrap_err();
        assert!(err.is_invalid_input_error());
    }

    #[test]
    fn hourly_booking_requires_hours_but_not_dropoff() {
        let request = test_request(BookingType::Hourly);
        assert!(Job::new(Uuid::new_v4(), request.clone(), None).is_ok());

        let mut request = request;
        request.hours = None;
        assert!(Job::new(Uuid::new_v4(), request, None).is_err());
    }

    #[test]
    fn bidding_is_derived_from_offers() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();
        assert_eq!(job.display_status(), DisplayStatus::Pending);

        job.place_bid(bid_from(Uuid::new_v4(), 25.0)).unwrap();

        assert_eq!(job.status, Status::Pending);
        assert_eq!(job.status.name(), "PENDING");
        assert_eq!(job.display_status(), DisplayStatus::Bidding);
    }

    #[test]
    fn one_bid_per_driver() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();
        let driver_id = Uuid::new_v4();

        job.place_bid(bid_from(driver_id, 25.0)).unwrap();
        let err = job.place_bid(bid_from(driver_id, 20.0)).unwrap_err();

        assert!(err.is_invalid_invocation_error());
        assert_eq!(job.bids.len(), 1);
    }

    #[test]
    fn requester_cannot_bid_on_own_job() {
        let requester_id = Uuid::new_v4();
        let mut job = Job::new(requester_id, test_request(BookingType::Distance), None).unwrap();

        assert!(job.place_bid(bid_from(requester_id, 25.0)).is_err());
    }

    #[test]
    fn accepting_a_bid_assigns_driver_and_price() {
        let (job, driver_id) = accepted_job();

        assert_eq!(job.status.name(), "ACCEPTED");
        assert_eq!(job.driver_id, Some(driver_id));
        assert_eq!(job.price, Some(30.0));
    }

    #[test]
    fn accepting_unknown_bid_fails() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();
        job.place_bid(bid_from(Uuid::new_v4(), 25.0)).unwrap();

        let err = job.accept_bid(Uuid::new_v4()).unwrap_err();

        assert!(err.is_invalid_input_error());
        assert!(job.is_open());
        assert_eq!(job.driver_id, None);
    }

    #[test]
    fn no_bids_after_acceptance() {
        let (mut job, _) = accepted_job();

        let err = job.place_bid(bid_from(Uuid::new_v4(), 10.0)).unwrap_err();
        assert!(err.is_invalid_invocation_error());
    }

    #[test]
    fn hourly_job_reaches_accepted_without_dropoff() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Hourly), None).unwrap();
        let bid = bid_from(Uuid::new_v4(), 90.0);
        let bid_id = bid.id;

        job.place_bid(bid).unwrap();
        job.accept_bid(bid_id).unwrap();

        assert!(job.dropoff.is_none());
        assert_eq!(job.status.name(), "ACCEPTED");
    }

    #[test]
    fn driver_progress_is_strictly_sequential() {
        let (mut job, _) = accepted_job();

        assert!(job.advance(Stage::DriverArrived).is_err());
        assert!(job.advance(Stage::Completed).is_err());

        job.advance(Stage::DriverEnRoute).unwrap();
        assert!(job.advance(Stage::DriverEnRoute).is_err());
        job.advance(Stage::DriverArrived).unwrap();
        job.advance(Stage::InProgress).unwrap();
        job.advance(Stage::Completed).unwrap();

        assert_eq!(job.status.name(), "COMPLETED");
        assert!(job.is_terminal());
        assert_eq!(job.next_stage(), None);
    }

    #[test]
    fn pending_job_cannot_advance() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();

        assert!(job.advance(Stage::DriverEnRoute).is_err());
    }

    #[test]
    fn participants_cannot_cancel_terminal_jobs() {
        let (mut job, driver_id) = accepted_job();
        job.advance(Stage::DriverEnRoute).unwrap();
        job.advance(Stage::DriverArrived).unwrap();
        job.advance(Stage::InProgress).unwrap();
        job.advance(Stage::Completed).unwrap();

        assert!(job.cancel(Party::Client, None).is_err());
        assert!(job.cancel(Party::Driver, None).is_err());

        let credits = job.settle(25.5);
        assert_eq!(credits, vec![Credit::new(driver_id, Account::Earnings, 25.5)]);

        let reversals = job.cancel(Party::Admin, Some("fraud".into())).unwrap();
        assert_eq!(job.status.name(), "CANCELLED");
        assert_eq!(reversals, vec![Credit::new(driver_id, Account::Earnings, -25.5)]);

        let net: f64 = job.settlement.iter().map(|credit| credit.amount).sum();
        assert_eq!(net, 0.0);

        assert!(job.cancel(Party::Admin, None).is_err());
    }

    #[test]
    fn split_settlement_credits_both_sides() {
        let (mut job, driver_id) = accepted_job();
        assert!(job.settle(25.5).is_empty());

        job.dispute(Party::Driver, "no-show".into()).unwrap();
        assert!(job.settle(25.5).is_empty());

        job.resolve(Resolution::Split).unwrap();
        let credits = job.settle(25.5);

        assert_eq!(
            credits,
            vec![
                Credit::new(job.requester_id, Account::Balance, 15.0),
                Credit::new(driver_id, Account::Earnings, 12.75),
            ]
        );
        assert_eq!(job.settlement, credits);
    }

    #[test]
    fn dispute_and_resolution() {
        let (mut job, _) = accepted_job();
        job.advance(Stage::DriverEnRoute).unwrap();

        assert!(job.dispute(Party::Client, "  ".into()).is_err());
        job.dispute(Party::Client, "driver never showed".into()).unwrap();

        assert!(!job.is_terminal());
        assert!(job.dispute(Party::Driver, "again".into()).is_err());
        assert!(job.advance(Stage::DriverArrived).is_err());

        job.resolve(Resolution::Split).unwrap();
        assert!(job.is_terminal());
        assert!(job.resolve(Resolution::Refund).is_err());
        assert!(job.reject(None).is_err());
    }

    #[test]
    fn resolve_requires_dispute() {
        let (mut job, _) = accepted_job();

        assert!(job.resolve(Resolution::Refund).is_err());
    }

    #[test]
    fn edits_are_limited_once_offers_exist() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();

        let changes = JobChanges {
            passengers: Some(4),
            ..JobChanges::default()
        };
        job.apply_changes(changes.clone()).unwrap();
        assert_eq!(job.passengers, 4);

        job.place_bid(bid_from(Uuid::new_v4(), 25.0)).unwrap();
        assert!(job.apply_changes(changes).is_err());

        let extras_only = JobChanges {
            extras: Some(Extras {
                flight_number: Some("LH 1234".into()),
                ..Extras::default()
            }),
            ..JobChanges::default()
        };
        job.apply_changes(extras_only).unwrap();
        assert_eq!(job.extras.flight_number.as_deref(), Some("LH 1234"));
    }

    #[test]
    fn invalid_edit_leaves_job_untouched() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();

        let changes = JobChanges {
            passengers: Some(0),
            ..JobChanges::default()
        };

        assert!(job.apply_changes(changes).is_err());
        assert_eq!(job.passengers, 2);
    }

    #[test]
    fn messages_are_trimmed_and_bounded() {
        let mut job = Job::new(Uuid::new_v4(), test_request(BookingType::Distance), None).unwrap();
        let author = Uuid::new_v4();

        let message = job.post_message(author, "  gate B  ".into()).unwrap();
        assert_eq!(message.body, "gate B");

        assert!(job.post_message(author, "".into()).is_err());
        assert!(job.post_message(author, "x".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
    }
}
