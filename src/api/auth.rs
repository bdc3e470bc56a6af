// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::http::Call;

use super::{Executor, User};

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TokenPair {
    pub(crate) access: String,
    pub(crate) refresh: String,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct AccessToken {
    pub(crate) access: String,
}

/// Exchange an ID number and password for a token pair.
pub(crate) struct ObtainToken {
    pub(crate) id_no: String,
    pub(crate) password: SecretString,
}

impl From<ObtainToken> for Call {
    fn from(value: ObtainToken) -> Self {
        Self::post(
            "/auth/token/",
            json!({
                "id_no": value.id_no,
                "password": value.password.expose_secret(),
            }),
        )
        .anonymous()
    }
}

impl Executor for ObtainToken {
    type Response = TokenPair;
}

pub(crate) struct RefreshToken {
    pub(crate) refresh: String,
}

impl From<RefreshToken> for Call {
    fn from(value: RefreshToken) -> Self {
        Self::post("/auth/token/refresh/", json!({ "refresh": value.refresh })).anonymous()
    }
}

impl Executor for RefreshToken {
    type Response = AccessToken;
}

pub(crate) struct Register {
    pub(crate) id_no: String,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) password: SecretString,
    pub(crate) password_confirm: SecretString,
}

impl From<Register> for Call {
    fn from(value: Register) -> Self {
        Self::post(
            "/auth/register/",
            json!({
                "id_no": value.id_no,
                "email": value.email,
                "name": value.name,
                "password": value.password.expose_secret(),
                "password_confirm": value.password_confirm.expose_secret(),
            }),
        )
        .anonymous()
    }
}

impl Executor for Register {
    type Response = User;
}
