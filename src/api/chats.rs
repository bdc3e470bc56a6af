// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::http::Call;

use super::{Executor, User};

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct LastMessage {
    pub(crate) content: String,
    pub(crate) sender: String,
    pub(crate) date_time: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Chat {
    pub(crate) chat_id: Uuid,
    pub(crate) participants: Vec<User>,
    #[serde(default)]
    pub(crate) is_group_chat: bool,
    #[serde(default)]
    pub(crate) last_message: Option<LastMessage>,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl Chat {
    pub(crate) fn has_participant(&self, id_no: &str) -> bool {
        self.participants.iter().any(|p| p.id_no == id_no)
    }

    /// The other participants, from the point of view of `me`.
    pub(crate) fn others<'chat>(&'chat self, me: &'chat str) -> impl Iterator<Item = &'chat User> {
        self.participants.iter().filter(move |p| p.id_no != me)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ChatDetail {
    pub(crate) chat_id: Uuid,
    #[serde(default)]
    pub(crate) participants: Vec<User>,
    #[serde(default)]
    pub(crate) messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct Message {
    pub(crate) id: Uuid,
    pub(crate) chat: Uuid,
    pub(crate) sender: User,
    pub(crate) content: String,
    pub(crate) date_time: DateTime<Utc>,
    #[serde(default)]
    pub(crate) is_read: bool,
}

/// The messages endpoint answers with the whole chat, messages included;
/// a bare list is accepted too.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MessagesPayload {
    List(Vec<Message>),
    Detail(ChatDetail),
}

impl MessagesPayload {
    pub(crate) fn into_messages(self) -> Vec<Message> {
        match self {
            Self::List(messages) => messages,
            Self::Detail(detail) => detail.messages,
        }
    }
}

pub(crate) struct ListChats;

impl From<ListChats> for Call {
    fn from(_: ListChats) -> Self {
        Self::get("/chats/")
    }
}

impl Executor for ListChats {
    type Response = Vec<Chat>;
}

pub(crate) struct CreateDirectChat {
    pub(crate) participant: String,
}

impl From<CreateDirectChat> for Call {
    fn from(value: CreateDirectChat) -> Self {
        Self::post(
            "/chats/",
            json!({
                "participants": [value.participant],
                "is_group_chat": false,
            }),
        )
    }
}

impl Executor for CreateDirectChat {
    type Response = ChatDetail;
}

pub(crate) struct DeleteChat {
    pub(crate) chat_id: Uuid,
}

impl From<DeleteChat> for Call {
    fn from(value: DeleteChat) -> Self {
        Self::delete(format!("/chats/{}/", value.chat_id))
    }
}

impl Executor for DeleteChat {
    type Response = ();
}

pub(crate) struct GetChatMessages {
    pub(crate) chat_id: Uuid,
}

impl From<GetChatMessages> for Call {
    fn from(value: GetChatMessages) -> Self {
        Self::get(format!("/chats/{}/messages/", value.chat_id))
    }
}

impl Executor for GetChatMessages {
    type Response = MessagesPayload;
}

pub(crate) struct SendMessage {
    pub(crate) chat_id: Uuid,
    pub(crate) content: String,
}

impl From<SendMessage> for Call {
    fn from(value: SendMessage) -> Self {
        Self::post(
            "/messages/",
            json!({
                "chat": value.chat_id,
                "content": value.content,
            }),
        )
    }
}

impl Executor for SendMessage {
    type Response = Message;
}

pub(crate) struct MarkRead {
    pub(crate) message_ids: Vec<Uuid>,
}

impl From<MarkRead> for Call {
    fn from(value: MarkRead) -> Self {
        Self::post(
            "/messages/mark_read/",
            json!({ "message_ids": value.message_ids }),
        )
    }
}

impl Executor for MarkRead {
    type Response = serde_json::Value;
}
