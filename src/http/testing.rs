// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use crate::error::Result;

use super::{Attempt, Call, Response, Transport};

#[derive(Clone, Debug)]
pub(crate) struct Recorded {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) bearer: Option<String>,
    pub(crate) body: Option<Value>,
    pub(crate) attempt: Attempt,
}

type Handler = Arc<dyn Fn(&Recorded) -> (StatusCode, Value) + Send + Sync>;

#[derive(Default)]
struct Route {
    once: VecDeque<(StatusCode, Value)>,
    handler: Option<Handler>,
}

/// A transport that answers from a script and remembers every call it saw.
/// Unscripted routes answer 404.
#[derive(Default)]
pub(crate) struct Scripted {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<Recorded>>,
}

impl Scripted {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer the next matching call, ahead of any standing response.
    pub(crate) fn once(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_owned()))
            .or_default()
            .once
            .push_back((status, body));
    }

    pub(crate) fn always(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.respond(method, path, move |_| (status, body.clone()));
    }

    pub(crate) fn respond<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Recorded) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_owned()))
            .or_default()
            .handler = Some(Arc::new(handler));
    }

    pub(crate) fn calls_to(&self, method: &Method, path: &str) -> Vec<Recorded> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == *method && call.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn send(&self, call: &Call, bearer: Option<&str>) -> Result<Response> {
        // Give concurrent callers a chance to interleave, as a real network
        // round trip would.
        tokio::task::yield_now().await;

        let recorded = Recorded {
            method: call.method().clone(),
            path: call.path().to_owned(),
            bearer: bearer.map(str::to_owned),
            body: call.body().cloned(),
            attempt: call.attempt(),
        };
        self.calls.lock().unwrap().push(recorded.clone());

        let (status, body) = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&(recorded.method.clone(), recorded.path.clone())) {
                Some(route) => match route.once.pop_front() {
                    Some(scripted) => scripted,
                    None => route.handler.as_ref().map_or_else(
                        || (StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
                        |handler| handler(&recorded),
                    ),
                },
                None => (StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
            }
        };
        Ok(Response { status, body })
    }
}

/// Mints an HS256 access token whose `exp` lies `lifetime` seconds from now
/// (negative for an already expired token).
pub(crate) fn access_token(user_id: &str, user_type: Option<&str>, lifetime: i64) -> String {
    let mut claims = json!({
        "token_type": "access",
        "exp": Utc::now().timestamp() + lifetime,
        "user_id": user_id,
    });
    if let Some(user_type) = user_type {
        claims["user_type"] = user_type.into();
    }
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"not-the-server-secret"),
    )
    .unwrap()
}
