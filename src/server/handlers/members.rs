use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{DynAPI, NewDocument, NewVehicle, Payout};
use crate::auth::User;
use crate::entities::member::Status as MemberStatus;
use crate::entities::{Member, Registration};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct ReviewDocumentParams {
    approved: bool,
}

#[derive(Serialize, Deserialize)]
pub struct SetStatusParams {
    status: MemberStatus,
}

pub async fn register(
    Extension(api): Extension<DynAPI>,
    Json(registration): Json<Registration>,
) -> Result<Json<Member>, Error> {
    let member = api.register(registration).await?;

    Ok(member.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, Error> {
    let member = api.find_member(user, id).await?;

    Ok(member.into())
}

pub async fn add_vehicle(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(vehicle): Json<NewVehicle>,
) -> Result<Json<Member>, Error> {
    let member = api.add_vehicle(user, id, vehicle).await?;

    Ok(member.into())
}

pub async fn submit_document(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(document): Json<NewDocument>,
) -> Result<Json<Member>, Error> {
    let member = api.submit_document(user, id, document).await?;

    Ok(member.into())
}

pub async fn review_document(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
    Json(params): Json<ReviewDocumentParams>,
) -> Result<Json<Member>, Error> {
    let member = api
        .review_document(user, id, document_id, params.approved)
        .await?;

    Ok(member.into())
}

pub async fn set_status(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<SetStatusParams>,
) -> Result<Json<Member>, Error> {
    let member = api.set_member_status(user, id, params.status).await?;

    Ok(member.into())
}

pub async fn payout(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<Payout>, Error> {
    let payout = api.payout(user, id).await?;

    Ok(payout.into())
}
