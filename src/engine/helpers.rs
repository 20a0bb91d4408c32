use super::Engine;

use uuid::Uuid;

use crate::{
    db::Store,
    entities::{Credit, Job, Member, PricingConfig, PricingThresholds},
    error::{not_found_error, Error},
    pricing,
};

pub const PRICING_CONFIG_KEY: &str = "pricing_config";
pub const PRICING_THRESHOLDS_KEY: &str = "pricing_thresholds";

#[tracing::instrument(skip(store))]
pub async fn fetch_job(store: &dyn Store, id: Uuid) -> Result<Job, Error> {
    store.find_job(id).await?.ok_or_else(not_found_error)
}

#[tracing::instrument(skip(store))]
pub async fn fetch_member(store: &dyn Store, id: Uuid) -> Result<Member, Error> {
    store.find_member(id).await?.ok_or_else(not_found_error)
}

/// The saved pricing configuration, or `None` when none was saved or the
/// stored one no longer validates.
#[tracing::instrument(skip(store))]
pub async fn load_pricing_config(store: &dyn Store) -> Result<Option<PricingConfig>, Error> {
    let value = match store.load_setting(PRICING_CONFIG_KEY).await? {
        Some(value) => value,
        None => return Ok(None),
    };

    let config: PricingConfig = serde_json::from_value(value)?;

    if let Err(err) = config.validate() {
        tracing::warn!("stored pricing config is invalid: {}", err);
        return Ok(None);
    }

    Ok(Some(config))
}

#[tracing::instrument(skip(store))]
pub async fn load_pricing_thresholds(store: &dyn Store) -> Result<PricingThresholds, Error> {
    let value = match store.load_setting(PRICING_THRESHOLDS_KEY).await? {
        Some(value) => value,
        None => return Ok(PricingThresholds::default()),
    };

    let thresholds: PricingThresholds = serde_json::from_value(value)?;

    if let Err(err) = thresholds.validate() {
        tracing::warn!("stored pricing thresholds are invalid, using defaults: {}", err);
        return Ok(PricingThresholds::default());
    }

    Ok(thresholds)
}

impl Engine {
    /// Records on `job` what its settlement owes each side, at the current
    /// commission. The job must be persisted before the returned credits
    /// are applied.
    pub(super) async fn settle(&self, job: &mut Job) -> Result<Vec<Credit>, Error> {
        let price = match job.price {
            Some(price) => price,
            None => return Ok(vec![]),
        };

        let config = load_pricing_config(self.store.as_ref()).await?;
        let (commission, driver_share) = pricing::split_commission(config.as_ref(), price);

        tracing::info!(commission, driver_share, "settling job");

        Ok(job.settle(driver_share))
    }

    /// Moves money for each credit. Members without the credited account
    /// (administrators booking for themselves) are skipped.
    #[tracing::instrument(skip(self))]
    pub(super) async fn apply_credits(&self, credits: &[Credit]) -> Result<(), Error> {
        for credit in credits {
            let member = fetch_member(self.store.as_ref(), credit.member_id).await?;

            if !member.holds(credit.account) {
                tracing::warn!(member_id = %member.id, "member has no {:?} account, skipping", credit.account);
                continue;
            }

            self.store.apply_ledger(member.id, credit.entry()).await?;

            tracing::info!(member_id = %member.id, amount = credit.amount, "ledger updated");
        }

        Ok(())
    }
}
