use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::{DisplayStatus, Job, JobChanges, JobRequest, Resolution, Stage};
use crate::error::Error;
use crate::offer::OfferFeedback;

/// A job as clients see it, with the derived display status next to the
/// stored one.
#[derive(Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    pub display_status: DisplayStatus,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        let display_status = job.display_status();

        Self {
            job,
            display_status,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct PlaceBidParams {
    vehicle_id: Uuid,
    amount: f64,
}

#[derive(Serialize, Deserialize)]
pub struct OfferParams {
    amount: f64,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateStatusParams {
    status: Stage,
}

#[derive(Serialize, Deserialize)]
pub struct ReasonParams {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct DisputeParams {
    reason: String,
}

#[derive(Serialize, Deserialize)]
pub struct ResolveParams {
    resolution: Resolution,
}

#[derive(Serialize, Deserialize)]
pub struct MessageParams {
    body: String,
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Json<Vec<JobView>>, Error> {
    let jobs = api.list_jobs(user).await?;

    Ok(Json(jobs.into_iter().map(JobView::from).collect()))
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(request): Json<JobRequest>,
) -> Result<Json<JobView>, Error> {
    let job = api.create_job(user, request).await?;

    Ok(Json(job.into()))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, Error> {
    let job = api.find_job(user, id).await?;

    Ok(Json(job.into()))
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(changes): Json<JobChanges>,
) -> Result<Json<JobView>, Error> {
    let job = api.update_job(user, id, changes).await?;

    Ok(Json(job.into()))
}

pub async fn place_bid(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<PlaceBidParams>,
) -> Result<Json<JobView>, Error> {
    let job = api
        .place_bid(user, id, params.vehicle_id, params.amount)
        .await?;

    Ok(Json(job.into()))
}

pub async fn evaluate_offer(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Query(params): Query<OfferParams>,
) -> Result<Json<Option<OfferFeedback>>, Error> {
    let feedback = api.evaluate_offer(user, id, params.amount).await?;

    Ok(feedback.into())
}

pub async fn accept_bid(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path((id, bid_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<JobView>, Error> {
    let job = api.accept_bid(user, id, bid_id).await?;

    Ok(Json(job.into()))
}

pub async fn update_status(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateStatusParams>,
) -> Result<Json<JobView>, Error> {
    let job = api.update_job_status(user, id, params.status).await?;

    Ok(Json(job.into()))
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<ReasonParams>,
) -> Result<Json<JobView>, Error> {
    let job = api.cancel_job(user, id, params.reason).await?;

    Ok(Json(job.into()))
}

pub async fn reject(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<ReasonParams>,
) -> Result<Json<JobView>, Error> {
    let job = api.reject_job(user, id, params.reason).await?;

    Ok(Json(job.into()))
}

pub async fn dispute(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<DisputeParams>,
) -> Result<Json<JobView>, Error> {
    let job = api.dispute_job(user, id, params.reason).await?;

    Ok(Json(job.into()))
}

pub async fn resolve(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<ResolveParams>,
) -> Result<Json<JobView>, Error> {
    let job = api.resolve_dispute(user, id, params.resolution).await?;

    Ok(Json(job.into()))
}

pub async fn post_message(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(params): Json<MessageParams>,
) -> Result<Json<JobView>, Error> {
    let job = api.post_message(user, id, params.body).await?;

    Ok(Json(job.into()))
}
