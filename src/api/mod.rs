// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod auth;
mod chats;
mod friends;
mod users;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::{
    error::Result,
    http::{ApiClient, Call},
};

pub(crate) use auth::{AccessToken, ObtainToken, RefreshToken, Register, TokenPair};
pub(crate) use chats::{
    Chat, CreateDirectChat, DeleteChat, GetChatMessages, ListChats, MarkRead, Message,
    MessagesPayload, SendMessage,
};
pub(crate) use friends::{Friend, ListFriends};
pub(crate) use users::{GetMe, PasswordChange, UpdateMe, UpdateUser, User, UserType};

/// An endpoint that can be turned into a [`Call`] and whose successful
/// response decodes into `Response`.
#[async_trait]
pub(crate) trait Executor: Into<Call> + Send + Sized {
    type Response: DeserializeOwned;

    async fn execute(self, client: &ApiClient) -> Result<Self::Response> {
        let body = client.send(self.into()).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Identifiers show up as strings in API payloads but may be numbers in
/// token claims.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        String(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::String(s) => s,
        Id::Signed(n) => n.to_string(),
        Id::Unsigned(n) => n.to_string(),
    })
}
