mod bid;
pub mod job;
pub mod member;
mod place;
mod pricing_config;
mod session;

pub use bid::Bid;
pub use job::{
    BookingType, Credit, DisplayStatus, Extras, Guest, Job, JobChanges, JobRequest, Message,
    Party, Resolution, Stage,
};
pub use member::{
    Account, Document, DocumentKind, DocumentStatus, LedgerEntry, Member, Profile, Registration,
    Role, Vehicle,
};
pub use place::{Coordinates, Place};
pub use pricing_config::{
    HourWindow, PeakSurcharge, PricingConfig, PricingThresholds, RateTier, WeekendSurcharge,
};
pub use session::Session;
