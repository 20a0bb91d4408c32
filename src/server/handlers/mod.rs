pub mod events;
pub mod jobs;
pub mod members;
pub mod pricing;
pub mod sessions;
