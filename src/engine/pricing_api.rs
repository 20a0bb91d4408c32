use super::helpers::{
    fetch_job, load_pricing_config, load_pricing_thresholds, PRICING_CONFIG_KEY,
    PRICING_THRESHOLDS_KEY,
};
use super::Engine;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::PricingAPI,
    auth::{Platform, User},
    entities::{PricingConfig, PricingThresholds},
    error::Error,
    offer::{self, OfferFeedback},
    pricing,
};

#[async_trait]
impl PricingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn get_pricing_config(&self, user: User) -> Result<Option<PricingConfig>, Error> {
        self.authorize(user, "read_pricing", Platform::default())?;

        load_pricing_config(self.store.as_ref()).await
    }

    #[tracing::instrument(skip(self, config))]
    async fn update_pricing_config(
        &self,
        user: User,
        config: PricingConfig,
    ) -> Result<PricingConfig, Error> {
        self.authorize(user, "manage_pricing", Platform::default())?;

        config.validate()?;

        self.store
            .save_setting(PRICING_CONFIG_KEY, serde_json::to_value(&config)?)
            .await?;

        tracing::info!("pricing config updated");

        Ok(config)
    }

    #[tracing::instrument(skip(self))]
    async fn get_pricing_thresholds(&self, user: User) -> Result<PricingThresholds, Error> {
        self.authorize(user, "read_pricing", Platform::default())?;

        load_pricing_thresholds(self.store.as_ref()).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_pricing_thresholds(
        &self,
        user: User,
        thresholds: PricingThresholds,
    ) -> Result<PricingThresholds, Error> {
        self.authorize(user, "manage_pricing", Platform::default())?;

        thresholds.validate()?;

        self.store
            .save_setting(PRICING_THRESHOLDS_KEY, serde_json::to_value(&thresholds)?)
            .await?;

        tracing::info!("pricing thresholds updated");

        Ok(thresholds)
    }

    #[tracing::instrument(skip(self))]
    async fn calculate_price(
        &self,
        user: User,
        distance_km: f64,
        vehicle_type: String,
        pickup_at: DateTime<Utc>,
    ) -> Result<Option<f64>, Error> {
        self.authorize(user, "read_pricing", Platform::default())?;

        let config = load_pricing_config(self.store.as_ref()).await?;

        Ok(pricing::calculate_price(
            config.as_ref(),
            distance_km,
            &vehicle_type,
            pickup_at,
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn evaluate_offer(
        &self,
        user: User,
        job_id: Uuid,
        amount: f64,
    ) -> Result<Option<OfferFeedback>, Error> {
        let job = fetch_job(self.store.as_ref(), job_id).await?;

        self.authorize(user, "read", job.clone())?;

        // jobs created before pricing was configured get a fresh estimate
        let estimate = match job.estimate {
            Some(estimate) => Some(estimate),
            None => {
                let config = load_pricing_config(self.store.as_ref()).await?;
                pricing::estimate(config.as_ref(), &job.as_request())
            }
        };

        let estimate = match estimate {
            Some(estimate) => estimate,
            None => return Ok(None),
        };

        let thresholds = load_pricing_thresholds(self.store.as_ref()).await?;

        Ok(offer::evaluate(amount, estimate, &thresholds))
    }
}
