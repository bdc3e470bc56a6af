// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use serde_json::Value;
use url::Url;

use crate::{error::Result, metadata};

use super::{Call, Response, Transport};

/// Talks to the API over HTTP. Paths are appended to the base URL verbatim,
/// so a base of `http://host/api` keeps its `/api` prefix.
pub(crate) struct Remote {
    http: reqwest::Client,
    base_url: Url,
}

impl Remote {
    pub(crate) fn new(base_url: Url) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        _ = headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(metadata::USER_AGENT.as_str())
                .default_headers(headers)
                .build()?,
            base_url,
        })
    }

    fn url_for(&self, path: &str) -> String {
        let mut url = self.base_url.as_str().trim_end_matches('/').to_owned();
        url.push_str(path);
        url
    }
}

#[async_trait]
impl Transport for Remote {
    async fn send(&self, call: &Call, bearer: Option<&str>) -> Result<Response> {
        let mut req = self
            .http
            .request(call.method().clone(), self.url_for(call.path()));
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = call.body() {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        // Error pages from proxies or the framework's debug mode are not
        // always JSON; keep them as text so the status still surfaces.
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(Response { status, body })
    }
}
