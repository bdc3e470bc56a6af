// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use log::error;

use crate::{
    api::{Message, User},
    chat::{ChatPoller, PollConfig},
    error::{Error, Result},
    session::{Access, Phase, SessionManager},
};

pub(crate) mod chats;
pub(crate) mod delete;
pub(crate) mod friends;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod messages;
pub(crate) mod profile;
pub(crate) mod register;
pub(crate) mod send;
pub(crate) mod start;
pub(crate) mod watch;
pub(crate) mod whoami;

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()>;
}

/// Restores the stored session and insists that it belongs to someone.
pub(crate) async fn authenticated(session: &SessionManager) -> Result<User> {
    session.bootstrap().await;
    if session.snapshot().phase() != Phase::Authenticated {
        match session.snapshot().last_error {
            Some(message) => error!("{}", message),
            None => error!("You are not logged in. Run the login command first."),
        }
    }
    session.require(Access::Authenticated)
}

/// Prints the message the session recorded for a failed operation and hands
/// the error back.
pub(crate) fn report(session: &SessionManager, err: Error) -> Error {
    if let Some(message) = session.snapshot().last_error {
        eprintln!("Error: {message}");
    }
    err
}

pub(crate) fn report_chat(poller: &ChatPoller, err: Error) -> Error {
    match poller.view().notice {
        Some(message) => eprintln!("Error: {message}"),
        None => eprintln!("Error: {err}"),
    }
    err
}

pub(crate) fn poller(session: &SessionManager) -> ChatPoller {
    ChatPoller::new(Arc::clone(session.api()), PollConfig::default())
}

pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M").to_string()
}

pub(crate) fn format_message(message: &Message, me: &str) -> String {
    let sender = if message.sender.id_no == me {
        "You"
    } else {
        message.sender.display_name()
    };
    format!(
        "[{}] {}: {}",
        format_time(&message.date_time),
        sender,
        message.content
    )
}
