use axum::extract::{Extension, Json, Query};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::{PricingConfig, PricingThresholds};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct EstimateParams {
    distance_km: f64,
    vehicle_type: String,
    #[serde(default)]
    pickup_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
pub struct EstimateResponse {
    estimate: Option<f64>,
}

pub async fn find_config(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Json<Option<PricingConfig>>, Error> {
    let config = api.get_pricing_config(user).await?;

    Ok(config.into())
}

pub async fn update_config(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(config): Json<PricingConfig>,
) -> Result<Json<PricingConfig>, Error> {
    let config = api.update_pricing_config(user, config).await?;

    Ok(config.into())
}

pub async fn find_thresholds(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Json<PricingThresholds>, Error> {
    let thresholds = api.get_pricing_thresholds(user).await?;

    Ok(thresholds.into())
}

pub async fn update_thresholds(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(thresholds): Json<PricingThresholds>,
) -> Result<Json<PricingThresholds>, Error> {
    let thresholds = api.update_pricing_thresholds(user, thresholds).await?;

    Ok(thresholds.into())
}

pub async fn estimate(
    Extension(api): Extension<DynAPI>,
    user: User,
    Query(params): Query<EstimateParams>,
) -> Result<Json<EstimateResponse>, Error> {
    let pickup_at = params.pickup_at.unwrap_or_else(Utc::now);
    let estimate = api
        .calculate_price(user, params.distance_km, params.vehicle_type, pickup_at)
        .await?;

    Ok(Json(EstimateResponse { estimate }))
}
