use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::SessionAPI,
    auth::{password, User},
    entities::{member::normalize_email, Member, Registration, Role, Session},
    error::{
        account_suspended_error, invalid_credential_error, invalid_field_error,
        user_not_found_error, wrong_password_error, Error,
    },
};

#[async_trait]
impl SessionAPI for Engine {
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email, role = ?registration.role))]
    async fn register(&self, registration: Registration) -> Result<Member, Error> {
        if registration.role == Role::Admin {
            return Err(invalid_field_error("role"));
        }

        let password_hash = password::hash_password(&registration.password)?;
        let member = Member::new(&registration, password_hash)?;

        self.store.insert_member(&member).await?;

        tracing::info!(member_id = %member.id, "registered member");

        Ok(member)
    }

    #[tracing::instrument(skip(self, password))]
    async fn login(&self, email: String, password: String) -> Result<Session, Error> {
        let member = self
            .store
            .find_member_by_email(&normalize_email(&email))
            .await?
            .ok_or_else(user_not_found_error)?;

        if !password::verify_password(&password, &member.password_hash)? {
            return Err(wrong_password_error());
        }

        if !member.status.can_login() {
            tracing::info!(member_id = %member.id, "login refused for {:?} member", member.status);
            return Err(account_suspended_error());
        }

        let session = Session::new(member.id, member.role, self.session_ttl);
        self.store.insert_session(&session).await?;

        tracing::info!(member_id = %member.id, "session opened");

        Ok(session)
    }

    #[tracing::instrument(skip(self, token))]
    async fn logout(&self, token: Uuid) -> Result<(), Error> {
        if !self.store.delete_session(token).await? {
            return Err(invalid_credential_error());
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, token))]
    async fn authenticate(&self, token: Uuid) -> Result<User, Error> {
        let session = self
            .store
            .find_session(token)
            .await?
            .ok_or_else(invalid_credential_error)?;

        if session.is_expired() {
            self.store.delete_session(token).await?;
            return Err(invalid_credential_error());
        }

        // suspension takes effect on open sessions too
        let member = self
            .store
            .find_member(session.member_id)
            .await?
            .ok_or_else(invalid_credential_error)?;

        if !member.status.can_login() {
            return Err(account_suspended_error());
        }

        Ok(User::from_session(&session))
    }
}
