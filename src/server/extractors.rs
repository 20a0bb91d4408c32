use async_trait::async_trait;
use axum::extract::{Extension, FromRequest, RequestParts};
use axum::http::header::AUTHORIZATION;
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::User;
use crate::error::{invalid_credential_error, unauthenticated_error, unexpected_error, Error};

/// Session token from an `Authorization: Bearer <token>` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BearerToken(pub Uuid);

#[async_trait]
impl<B: Send> FromRequest<B> for BearerToken {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .ok_or_else(unauthenticated_error)?;

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(invalid_credential_error)?;

        let token = Uuid::parse_str(token.trim()).map_err(|_| invalid_credential_error())?;

        Ok(BearerToken(token))
    }
}

#[async_trait]
impl<B: Send> FromRequest<B> for User {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request(req).await?;

        let Extension(api) = Extension::<DynAPI>::from_request(req)
            .await
            .map_err(|_| unexpected_error())?;

        api.authenticate(token).await
    }
}
