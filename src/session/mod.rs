// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod claims;

use std::sync::{Arc, Weak};

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    api::{self, Executor as _, User, UserType},
    error::{Error, Result},
    http::ApiClient,
    storage::Key,
};

pub(crate) use claims::Claims;

pub(crate) const SESSION_EXPIRED: &str = "Session expired. Please login again.";
const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";
const PROFILE_UPDATE_FAILED: &str = "Profile update failed. Please try again.";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Bootstrapping,
    Anonymous,
    Authenticated,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    Authenticated,
    Privileged,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) user: Option<User>,
    pub(crate) loading: bool,
    pub(crate) last_error: Option<String>,
}

impl Snapshot {
    const fn bootstrapping() -> Self {
        Self {
            user: None,
            loading: true,
            last_error: None,
        }
    }

    pub(crate) const fn phase(&self) -> Phase {
        match (self.loading, &self.user) {
            (true, _) => Phase::Bootstrapping,
            (false, None) => Phase::Anonymous,
            (false, Some(_)) => Phase::Authenticated,
        }
    }

    /// Maintainers and developers. Only decides what to offer; the server
    /// does its own authorization.
    pub(crate) fn is_privileged(&self) -> bool {
        matches!(
            self.user.as_ref().map(|u| u.user_type),
            Some(UserType::Maintainer | UserType::Developer)
        )
    }

    pub(crate) fn is_developer(&self) -> bool {
        matches!(
            self.user.as_ref().map(|u| u.user_type),
            Some(UserType::Developer)
        )
    }
}

/// Owns who is logged in. Consumers get it injected and observe changes
/// through [`SessionManager::subscribe`].
pub(crate) struct SessionManager {
    api: Arc<ApiClient>,
    state: watch::Sender<Snapshot>,
}

impl SessionManager {
    pub(crate) fn new(api: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(Snapshot::bootstrapping());
        Self { api, state }
    }

    pub(crate) fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub(crate) fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub(crate) fn is_privileged(&self) -> bool {
        self.state.borrow().is_privileged()
    }

    pub(crate) fn is_developer(&self) -> bool {
        self.state.borrow().is_developer()
    }

    pub(crate) fn set_error(&self, message: &str) {
        self.state
            .send_modify(|s| s.last_error = Some(message.to_owned()));
    }

    pub(crate) fn clear_error(&self) {
        self.state.send_if_modified(|s| s.last_error.take().is_some());
    }

    pub(crate) fn require(&self, access: Access) -> Result<User> {
        let snapshot = self.state.borrow();
        let user = snapshot.user.clone().ok_or(Error::NotAuthenticated)?;
        match access {
            Access::Authenticated => Ok(user),
            Access::Privileged if snapshot.is_privileged() => Ok(user),
            Access::Privileged => Err(Error::NotPrivileged),
        }
    }

    /// Restores the session from stored credentials. Runs once at startup
    /// and always leaves `loading` unset.
    pub(crate) async fn bootstrap(&self) {
        if let Err(err) = self.restore().await {
            warn!("Could not restore the previous session: {}", err);
            self.set_error(SESSION_EXPIRED);
            self.logout().await;
        }
        self.state.send_modify(|s| s.loading = false);
    }

    async fn restore(&self) -> Result<()> {
        let storage = self.api.storage();
        let access = storage.get(Key::AccessToken).await?;
        let refresh = storage.get(Key::RefreshToken).await?;
        let (Some(access), Some(_)) = (access, refresh) else {
            debug!("No stored credentials; starting anonymously");
            return Ok(());
        };

        let claims = Claims::decode(&access)?;
        if claims.is_expired_at(Utc::now()) {
            info!("Stored access token has expired; refreshing it");
            _ = self.refresh().await?;
        } else {
            self.authenticate(claims.to_user());
            self.enrich().await;
        }
        Ok(())
    }

    pub(crate) async fn login(&self, credentials: api::ObtainToken) -> Result<api::TokenPair> {
        self.clear_error();
        match self.try_login(credentials).await {
            Ok(tokens) => Ok(tokens),
            Err(err) => {
                warn!("Login failed: {}", err);
                self.set_error(err.detail().unwrap_or(LOGIN_FAILED));
                Err(err)
            }
        }
    }

    async fn try_login(&self, credentials: api::ObtainToken) -> Result<api::TokenPair> {
        let tokens = credentials.execute(&self.api).await?;
        let claims = Claims::decode(&tokens.access)?;

        let storage = self.api.storage();
        storage.set(Key::AccessToken, &tokens.access).await?;
        storage.set(Key::RefreshToken, &tokens.refresh).await?;

        self.authenticate(claims.to_user());
        self.enrich().await;
        Ok(tokens)
    }

    /// Creates an account. Does not log in.
    pub(crate) async fn register(&self, registration: api::Register) -> Result<User> {
        self.clear_error();
        registration.execute(&self.api).await.map_err(|err| {
            warn!("Registration failed: {}", err);
            self.set_error(err.detail_or_field_error().unwrap_or(REGISTRATION_FAILED));
            err
        })
    }

    /// Trades the refresh token for a new access token. Any failure ends the
    /// session; there is no second attempt.
    pub(crate) async fn refresh(&self) -> Result<String> {
        match self.try_refresh().await {
            Ok(access) => Ok(access),
            Err(err) => {
                warn!("Session refresh failed: {}", err);
                self.logout().await;
                Err(err)
            }
        }
    }

    async fn try_refresh(&self) -> Result<String> {
        if self.api.storage().get(Key::RefreshToken).await?.is_none() {
            return Err(Error::NoRefreshToken);
        }

        let access = self.api.refresh_access_token().await?;
        let claims = Claims::decode(&access)?;
        self.authenticate(claims.to_user());
        self.enrich().await;
        Ok(access)
    }

    pub(crate) async fn logout(&self) {
        if let Err(err) = self.api.storage().clear().await {
            error!("Could not remove stored credentials: {}", err);
        }
        self.state.send_if_modified(|s| s.user.take().is_some());
    }

    pub(crate) async fn update_profile(&self, update: api::UpdateMe) -> Result<User> {
        self.clear_error();
        match update.execute(&self.api).await {
            Ok(user) => {
                self.authenticate(user.clone());
                Ok(user)
            }
            Err(err) => {
                warn!("Profile update failed: {}", err);
                self.set_error(err.detail_or_field_error().unwrap_or(PROFILE_UPDATE_FAILED));
                Err(err)
            }
        }
    }

    /// Edits another user's profile. Ordinary users are turned away before
    /// anything is sent.
    pub(crate) async fn update_user(&self, update: api::UpdateUser) -> Result<User> {
        let me = self.require(Access::Privileged)?;
        self.clear_error();
        match update.execute(&self.api).await {
            Ok(user) => {
                if user.id_no == me.id_no {
                    self.authenticate(user.clone());
                }
                Ok(user)
            }
            Err(err) => {
                warn!("Updating another user's profile failed: {}", err);
                self.set_error(err.detail_or_field_error().unwrap_or(PROFILE_UPDATE_FAILED));
                Err(err)
            }
        }
    }

    /// Ends the session whenever the HTTP client gives up on the stored
    /// credentials after a failed refresh.
    pub(crate) fn track_credentials(self: &Arc<Self>) -> JoinHandle<()> {
        let mut cleared = self.api.subscribe_cleared();
        let session: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            while cleared.changed().await.is_ok() {
                let Some(session) = session.upgrade() else {
                    break;
                };
                if session.current_user().is_some() {
                    info!("Stored credentials were cleared; ending the session");
                    session.set_error(SESSION_EXPIRED);
                    session.logout().await;
                }
            }
        })
    }

    fn authenticate(&self, user: User) {
        debug!("Authenticated as {} ({})", user.id_no, user.user_type);
        self.state.send_modify(|s| s.user = Some(user));
    }

    /// Replaces the token-derived user with the full profile. A failure here
    /// keeps the user as it was, unless it cost us the credentials.
    async fn enrich(&self) {
        match api::GetMe.execute(&self.api).await {
            Ok(user) => self.authenticate(user),
            Err(err) => {
                warn!("Could not fetch the current user's profile: {}", err);
                if matches!(self.api.storage().get(Key::AccessToken).await, Ok(None)) {
                    self.set_error(SESSION_EXPIRED);
                    self.logout().await;
                }
            }
        }
    }
}
