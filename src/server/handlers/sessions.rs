use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::api::DynAPI;
use crate::entities::Session;
use crate::error::Error;
use crate::server::BearerToken;

#[derive(Serialize, Deserialize)]
pub struct LoginParams {
    email: String,
    password: String,
}

pub async fn login(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<LoginParams>,
) -> Result<Json<Session>, Error> {
    let session = api.login(params.email, params.password).await?;

    Ok(session.into())
}

pub async fn logout(
    Extension(api): Extension<DynAPI>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, Error> {
    api.logout(token).await?;

    Ok(StatusCode::NO_CONTENT)
}
