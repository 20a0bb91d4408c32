use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub amount: f64,
    pub vehicle: String,
    pub vehicle_type: String,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(
        driver_id: Uuid,
        amount: f64,
        vehicle: String,
        vehicle_type: String,
        rating: Option<f64>,
    ) -> Self {
        Bid {
            id: Uuid::new_v4(),
            driver_id,
            amount,
            vehicle,
            vehicle_type,
            rating,
            created_at: Utc::now(),
        }
    }
}
