// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod remote;
#[cfg(test)]
pub(crate) mod testing;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::{watch, Mutex};

use crate::{
    api,
    error::{ApiError, Error, Result},
    storage::{Key, Storage},
};

pub(crate) use remote::Remote;

/// Whether a call is going out for the first time or is the single replay
/// allowed after a token refresh.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Attempt {
    Initial,
    Replay,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Auth {
    /// Attach the stored access token and refresh it on 401.
    Bearer,
    /// Send without credentials; a 401 is returned to the caller untouched.
    Anonymous,
}

#[derive(Clone)]
pub(crate) struct Call {
    method: Method,
    path: String,
    body: Option<Value>,
    auth: Auth,
    attempt: Attempt,
}

impl Call {
    fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            auth: Auth::Bearer,
            attempt: Attempt::Initial,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, None)
    }

    pub(crate) fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path, Some(body))
    }

    pub(crate) fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path, Some(body))
    }

    pub(crate) fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path, Some(body))
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path, None)
    }

    #[must_use]
    pub(crate) fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    #[must_use]
    pub(crate) fn replay(&self) -> Self {
        Self {
            attempt: Attempt::Replay,
            ..self.clone()
        }
    }

    pub(crate) const fn method(&self) -> &Method {
        &self.method
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub(crate) const fn auth(&self) -> Auth {
        self.auth
    }

    pub(crate) const fn attempt(&self) -> Attempt {
        self.attempt
    }
}

// Bodies carry passwords and tokens, so they never end up in logs.
impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("auth", &self.auth)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Response {
    pub(crate) status: StatusCode,
    pub(crate) body: Value,
}

#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn send(&self, call: &Call, bearer: Option<&str>) -> Result<Response>;
}

/// The single outbound path to the API. Attaches the stored access token to
/// every call and, on a 401, refreshes it once and replays the call.
pub(crate) struct ApiClient {
    storage: Arc<dyn Storage>,
    transport: Arc<dyn Transport>,
    refresh_gate: Mutex<()>,
    cleared: watch::Sender<u64>,
}

impl ApiClient {
    pub(crate) fn new(storage: Arc<dyn Storage>, transport: Arc<dyn Transport>) -> Self {
        let (cleared, _) = watch::channel(0);
        Self {
            storage,
            transport,
            refresh_gate: Mutex::new(()),
            cleared,
        }
    }

    pub(crate) fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Ticks every time a failed refresh wipes the stored credentials.
    pub(crate) fn subscribe_cleared(&self) -> watch::Receiver<u64> {
        self.cleared.subscribe()
    }

    pub(crate) async fn send(&self, call: Call) -> Result<Value> {
        let bearer = match call.auth() {
            Auth::Bearer => self.storage.get(Key::AccessToken).await?,
            Auth::Anonymous => None,
        };

        let rejection = match self.dispatch(&call, bearer.as_deref()).await {
            Err(err)
                if err.is_unauthorized()
                    && call.auth() == Auth::Bearer
                    && call.attempt() == Attempt::Initial =>
            {
                err
            }
            result => return result,
        };

        debug!("{:?} was rejected as unauthorized; refreshing access token", call);
        let access = match self.refresh_rejected(bearer.as_deref()).await {
            Ok(access) => access,
            Err(Error::NoRefreshToken) => return Err(rejection),
            Err(err) => return Err(err),
        };

        self.dispatch(&call.replay(), Some(&access)).await
    }

    /// Exchanges the stored refresh token for a new access token, persists
    /// it and returns it. Concurrent callers queue behind one another.
    pub(crate) async fn refresh_access_token(&self) -> Result<String> {
        let _gate = self.refresh_gate.lock().await;
        self.exchange_refresh_token().await
    }

    async fn refresh_rejected(&self, rejected: Option<&str>) -> Result<String> {
        let _gate = self.refresh_gate.lock().await;
        // A token other than the rejected one (or any token at all, when the
        // call went out without one) was stored while we waited.
        if let Some(current) = self.storage.get(Key::AccessToken).await? {
            if rejected != Some(current.as_str()) {
                debug!("Access token was already refreshed by a concurrent call");
                return Ok(current);
            }
        }
        self.exchange_refresh_token().await
    }

    async fn exchange_refresh_token(&self) -> Result<String> {
        let Some(refresh) = self.storage.get(Key::RefreshToken).await? else {
            info!("No refresh token is stored; clearing credentials");
            self.clear_credentials().await;
            return Err(Error::NoRefreshToken);
        };

        let result: Result<String> = async {
            let call: Call = api::RefreshToken { refresh }.into();
            let body = self.dispatch(&call, None).await?;
            let token: api::AccessToken = serde_json::from_value(body)?;
            self.storage.set(Key::AccessToken, &token.access).await?;
            Ok(token.access)
        }
        .await;

        if let Err(ref err) = result {
            warn!("Refreshing the access token failed: {}", err);
            self.clear_credentials().await;
        }
        result
    }

    async fn clear_credentials(&self) {
        if let Err(err) = self.storage.clear().await {
            error!("Could not remove stored credentials: {}", err);
        }
        self.cleared.send_modify(|generation| *generation += 1);
    }

    async fn dispatch(&self, call: &Call, bearer: Option<&str>) -> Result<Value> {
        debug!("Sending {:?}", call);
        let resp = self.transport.send(call, bearer).await?;
        if resp.status.is_success() {
            Ok(resp.body)
        } else {
            debug!("{:?} failed with {}", call, resp.status);
            Err(ApiError::new(resp.status, resp.body).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{testing::Scripted, *};
    use crate::storage::Memory;

    async fn client_with(
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<(ApiClient, Arc<Scripted>, Arc<Memory>)> {
        let storage = Arc::new(Memory::new());
        if let Some(access) = access {
            storage.set(Key::AccessToken, access).await?;
        }
        if let Some(refresh) = refresh {
            storage.set(Key::RefreshToken, refresh).await?;
        }
        let transport = Arc::new(Scripted::new());
        let client = ApiClient::new(
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        Ok((client, transport, storage))
    }

    #[tokio::test]
    async fn attaches_the_stored_token_at_send_time() -> Result<()> {
        let (client, transport, storage) = client_with(Some("first"), None).await?;
        transport.always(Method::GET, "/chats/", StatusCode::OK, json!([]));

        _ = client.send(Call::get("/chats/")).await?;
        storage.set(Key::AccessToken, "second").await?;
        _ = client.send(Call::get("/chats/")).await?;

        let bearers: Vec<_> = transport
            .calls_to(&Method::GET, "/chats/")
            .into_iter()
            .map(|call| call.bearer)
            .collect();
        assert_eq!(
            bearers,
            vec![Some("first".to_owned()), Some("second".to_owned())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn refreshes_once_and_replays_transparently() -> Result<()> {
        let (client, transport, storage) = client_with(Some("stale"), Some("refresh")).await?;
        transport.respond(Method::GET, "/users/me/", |call| {
            if call.bearer.as_deref() == Some("fresh") {
                (StatusCode::OK, json!({"id_no": "2023A7PS0466G"}))
            } else {
                (StatusCode::UNAUTHORIZED, json!({"detail": "Token is invalid or expired"}))
            }
        });
        transport.once(
            Method::POST,
            "/auth/token/refresh/",
            StatusCode::OK,
            json!({"access": "fresh"}),
        );

        let body = client.send(Call::get("/users/me/")).await?;

        assert_eq!(body, json!({"id_no": "2023A7PS0466G"}));
        assert_eq!(storage.get(Key::AccessToken).await?.as_deref(), Some("fresh"));
        assert_eq!(
            storage.get(Key::RefreshToken).await?.as_deref(),
            Some("refresh")
        );

        let refreshes = transport.calls_to(&Method::POST, "/auth/token/refresh/");
        assert_eq!(refreshes.len(), 1);
        assert_eq!(refreshes[0].bearer, None);
        assert_eq!(refreshes[0].body, Some(json!({"refresh": "refresh"})));

        let attempts: Vec<_> = transport
            .calls_to(&Method::GET, "/users/me/")
            .into_iter()
            .map(|call| call.attempt)
            .collect();
        assert_eq!(attempts, vec![Attempt::Initial, Attempt::Replay]);
        Ok(())
    }

    #[tokio::test]
    async fn never_replays_a_replay() -> Result<()> {
        let (client, transport, _) = client_with(Some("stale"), Some("refresh")).await?;
        transport.always(
            Method::GET,
            "/chats/",
            StatusCode::UNAUTHORIZED,
            json!({"detail": "nope"}),
        );
        transport.always(
            Method::POST,
            "/auth/token/refresh/",
            StatusCode::OK,
            json!({"access": "fresh"}),
        );

        let err = client.send(Call::get("/chats/")).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(transport.calls_to(&Method::GET, "/chats/").len(), 2);
        assert_eq!(
            transport.calls_to(&Method::POST, "/auth/token/refresh/").len(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_refresh_token_clears_and_returns_the_rejection() -> Result<()> {
        let (client, transport, storage) = client_with(Some("stale"), None).await?;
        let mut cleared = client.subscribe_cleared();
        transport.always(
            Method::GET,
            "/chats/",
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Given token not valid for any token type"}),
        );

        let err = client.send(Call::get("/chats/")).await.unwrap_err();

        assert_eq!(err.detail(), Some("Given token not valid for any token type"));
        assert_eq!(storage.get(Key::AccessToken).await?, None);
        assert!(transport
            .calls_to(&Method::POST, "/auth/token/refresh/")
            .is_empty());
        assert!(cleared.has_changed().unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_clears_and_returns_refresh_error() -> Result<()> {
        let (client, transport, storage) = client_with(Some("stale"), Some("expired")).await?;
        transport.always(Method::GET, "/chats/", StatusCode::UNAUTHORIZED, json!({}));
        transport.always(
            Method::POST,
            "/auth/token/refresh/",
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Token is blacklisted"}),
        );

        let err = client.send(Call::get("/chats/")).await.unwrap_err();

        assert_eq!(err.detail(), Some("Token is blacklisted"));
        assert_eq!(storage.get(Key::AccessToken).await?, None);
        assert_eq!(storage.get(Key::RefreshToken).await?, None);
        assert_eq!(transport.calls_to(&Method::GET, "/chats/").len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn other_failures_pass_through() -> Result<()> {
        let (client, transport, _) = client_with(Some("token"), Some("refresh")).await?;
        transport.always(
            Method::GET,
            "/chats/",
            StatusCode::INTERNAL_SERVER_ERROR,
            json!("Server Error (500)"),
        );

        let err = client.send(Call::get("/chats/")).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(transport.calls_to(&Method::GET, "/chats/").len(), 1);
        assert!(transport
            .calls_to(&Method::POST, "/auth/token/refresh/")
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_calls_skip_credentials() -> Result<()> {
        let (client, transport, _) = client_with(Some("token"), Some("refresh")).await?;
        transport.always(
            Method::POST,
            "/auth/token/",
            StatusCode::UNAUTHORIZED,
            json!({"detail": "No active account found with the given credentials"}),
        );

        let err = client
            .send(Call::post("/auth/token/", json!({})).anonymous())
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(transport.calls_to(&Method::POST, "/auth/token/")[0].bearer, None);
        assert!(transport
            .calls_to(&Method::POST, "/auth/token/refresh/")
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_rejections_share_one_refresh() -> Result<()> {
        let (client, transport, _) = client_with(Some("stale"), Some("refresh")).await?;
        for path in ["/chats/", "/friends/my_friends/"] {
            transport.respond(Method::GET, path, |call| {
                if call.bearer.as_deref() == Some("fresh") {
                    (StatusCode::OK, json!([]))
                } else {
                    (StatusCode::UNAUTHORIZED, json!({}))
                }
            });
        }
        transport.always(
            Method::POST,
            "/auth/token/refresh/",
            StatusCode::OK,
            json!({"access": "fresh"}),
        );

        let (chats, friends) = tokio::join!(
            client.send(Call::get("/chats/")),
            client.send(Call::get("/friends/my_friends/")),
        );

        assert_eq!(chats?, json!([]));
        assert_eq!(friends?, json!([]));
        assert_eq!(
            transport.calls_to(&Method::POST, "/auth/token/refresh/").len(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_rejections_without_a_token_share_one_refresh() -> Result<()> {
        let (client, transport, storage) = client_with(None, Some("refresh")).await?;
        for path in ["/chats/", "/friends/my_friends/"] {
            transport.respond(Method::GET, path, |call| {
                if call.bearer.as_deref() == Some("fresh") {
                    (StatusCode::OK, json!([]))
                } else {
                    (StatusCode::UNAUTHORIZED, json!({}))
                }
            });
        }
        transport.always(
            Method::POST,
            "/auth/token/refresh/",
            StatusCode::OK,
            json!({"access": "fresh"}),
        );

        let (chats, friends) = tokio::join!(
            client.send(Call::get("/chats/")),
            client.send(Call::get("/friends/my_friends/")),
        );

        assert_eq!(chats?, json!([]));
        assert_eq!(friends?, json!([]));
        assert_eq!(
            transport.calls_to(&Method::POST, "/auth/token/refresh/").len(),
            1
        );
        assert_eq!(
            storage.get(Key::AccessToken).await?.as_deref(),
            Some("fresh")
        );
        Ok(())
    }
}
