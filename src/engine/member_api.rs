use super::helpers::fetch_member;
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::{MemberAPI, NewDocument, NewVehicle, Payout},
    auth::User,
    entities::member::Status as MemberStatus,
    entities::{Document, DocumentStatus, LedgerEntry, Member, Vehicle},
    error::Error,
};

#[async_trait]
impl MemberAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_member(&self, user: User, id: Uuid) -> Result<Member, Error> {
        let member = fetch_member(self.store.as_ref(), id).await?;

        self.authorize(user, "read", member.clone())?;

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn add_vehicle(&self, user: User, id: Uuid, vehicle: NewVehicle) -> Result<Member, Error> {
        let mut member = fetch_member(self.store.as_ref(), id).await?;

        self.authorize(user, "manage", member.clone())?;

        member.add_vehicle(Vehicle {
            id: Uuid::new_v4(),
            make: vehicle.make.trim().into(),
            model: vehicle.model.trim().into(),
            plate: vehicle.plate.trim().to_uppercase(),
            vehicle_type: vehicle.vehicle_type.trim().into(),
            seats: vehicle.seats,
        })?;

        self.store.update_member(&mut member).await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn submit_document(
        &self,
        user: User,
        id: Uuid,
        document: NewDocument,
    ) -> Result<Member, Error> {
        let mut member = fetch_member(self.store.as_ref(), id).await?;

        self.authorize(user, "manage", member.clone())?;

        member.submit_document(Document {
            id: Uuid::new_v4(),
            kind: document.kind,
            url: document.url.trim().into(),
            status: DocumentStatus::Pending,
            submitted_at: Utc::now(),
        })?;

        self.store.update_member(&mut member).await?;

        tracing::info!(status = ?member.status, "document submitted");

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn review_document(
        &self,
        user: User,
        id: Uuid,
        document_id: Uuid,
        approved: bool,
    ) -> Result<Member, Error> {
        let mut member = fetch_member(self.store.as_ref(), id).await?;

        self.authorize(user, "review", member.clone())?;

        member.review_document(document_id, approved)?;
        self.store.update_member(&mut member).await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn set_member_status(
        &self,
        user: User,
        id: Uuid,
        status: MemberStatus,
    ) -> Result<Member, Error> {
        let mut member = fetch_member(self.store.as_ref(), id).await?;

        self.authorize(user, "review", member.clone())?;

        member.set_status(status);
        self.store.update_member(&mut member).await?;

        tracing::info!("member status set to {}", status.name());

        Ok(member)
    }

    #[tracing::instrument(skip(self))]
    async fn payout(&self, user: User, id: Uuid) -> Result<Payout, Error> {
        let member = fetch_member(self.store.as_ref(), id).await?;

        self.authorize(user, "payout", member.clone())?;

        let amount = self.store.apply_ledger(member.id, LedgerEntry::PayOut).await?;

        tracing::info!(amount, "driver earnings paid out");

        Ok(Payout {
            member_id: member.id,
            amount,
        })
    }
}
