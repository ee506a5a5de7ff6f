//! Session controller.
//!
//! Owns the authentication state machine on top of the credential store and
//! the auth client: login persists tokens before anything else, logout always
//! clears local state, profile mutations keep the cached profile in sync with
//! the store.

use std::sync::Arc;

use crate::clients::AuthClient;
use crate::error::ApiError;
use crate::session::store::CredentialStore;
use crate::types::{ProfileUpdate, RegisterForm, Session, UserProfile};

pub struct SessionController {
    store: Arc<CredentialStore>,
    auth: AuthClient,
    user: Option<UserProfile>,
}

impl SessionController {
    /// Restores controller state from the persisted session, if any.
    pub fn new(store: Arc<CredentialStore>, auth: AuthClient) -> Self {
        let user = store
            .load()
            .filter(|session| !session.access.is_empty())
            .and_then(|session| session.user);
        Self { store, auth, user }
    }

    /// True when both tokens and a cached profile are present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Logs in and fetches the profile.
    ///
    /// Tokens are persisted as soon as the backend issues them, before the
    /// profile fetch. If the profile fetch fails the tokens survive, the
    /// error propagates, and the controller stays unauthenticated.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the login or the profile fetch fails.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let response = self.auth.login(email, password).await?;

        self.store
            .save(&Session {
                access: response.access,
                refresh: response.refresh,
                user: None,
            })
            .map_err(|err| ApiError::Store(err.to_string()))?;

        let profile = self.auth.get_profile().await?;
        self.persist_user(profile.clone())?;
        tracing::debug!(email, "logged in");
        Ok(profile)
    }

    /// Registers a new account and persists the issued session.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if registration fails.
    pub async fn register(&mut self, form: &RegisterForm) -> Result<UserProfile, ApiError> {
        let response = self.auth.register(form).await?;

        self.store
            .save(&Session {
                access: response.tokens.access,
                refresh: response.tokens.refresh,
                user: Some(response.user.clone()),
            })
            .map_err(|err| ApiError::Store(err.to_string()))?;
        self.user = Some(response.user.clone());
        tracing::debug!(email = %form.email, "registered");
        Ok(response.user)
    }

    /// Logs out: best-effort token blacklist on the backend, then
    /// unconditional local teardown. Never fails.
    pub async fn logout(&mut self) {
        if let Some(session) = self.store.load()
            && !session.refresh.is_empty()
            && let Err(err) = self.auth.logout(&session.refresh).await
        {
            tracing::debug!(%err, "backend logout failed, clearing local session anyway");
        }

        if let Err(err) = self.store.clear() {
            tracing::warn!(%err, "failed to clear credential store");
        }
        self.user = None;
    }

    /// Re-fetches the profile from the backend and caches it.
    ///
    /// # Errors
    /// Returns an [`ApiError`] on failure; the persisted session is left
    /// untouched in that case.
    pub async fn refresh_profile(&mut self) -> Result<UserProfile, ApiError> {
        let profile = self.auth.get_profile().await?;
        self.persist_user(profile.clone())?;
        Ok(profile)
    }

    /// Applies a partial profile update and merges the response into the
    /// cached profile, so fields the backend omits keep their local values.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the update fails or the response cannot
    /// stand in for a profile.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let response = self.auth.update_profile(update).await?;

        let merged = match self.user.take() {
            Some(current) => current.merged_with(response.user),
            None => response.user.into_profile().ok_or_else(|| {
                ApiError::InvalidResponse("profile update response missing identity".to_string())
            })?,
        };
        self.persist_user(merged.clone())?;
        Ok(merged)
    }

    /// Changes the password. Tokens stay valid; nothing to persist.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the backend's validation message on
    /// rejection.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<String, ApiError> {
        self.auth
            .change_password(old_password, new_password, new_password_confirm)
            .await
    }

    /// Writes the profile into the persisted session. Loads the session
    /// fresh first: the pipeline may have rotated the access token while the
    /// request was in flight.
    fn persist_user(&mut self, profile: UserProfile) -> Result<(), ApiError> {
        let Some(mut session) = self.store.load() else {
            return Err(ApiError::Store("no persisted session".to_string()));
        };
        session.user = Some(profile.clone());
        self.store
            .save(&session)
            .map_err(|err| ApiError::Store(err.to_string()))?;
        self.user = Some(profile);
        Ok(())
    }
}
