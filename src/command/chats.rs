// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use futures_util::future;
use tabled::{
    settings::{object::Segment, Alignment, Modify, Style},
    Table, Tabled,
};
use uuid::Uuid;

use crate::{
    api::{self, Chat, Executor as _},
    chat,
    error::Result,
    session::SessionManager,
};

/// List your conversations.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "ID")]
    chat_id: Uuid,
    #[tabled(rename = "With")]
    with: String,
    #[tabled(rename = "Last Message")]
    last_message: String,
    #[tabled(rename = "At")]
    at: String,
}

impl Row {
    fn new(chat: &Chat, me: &str) -> Self {
        Self {
            chat_id: chat.chat_id,
            with: chat
                .others(me)
                .map(api::User::display_name)
                .collect::<Vec<_>>()
                .join(", "),
            last_message: chat
                .last_message
                .as_ref()
                .map(|m| format!("{}: {}", m.sender, m.content))
                .unwrap_or_default(),
            at: chat
                .last_message
                .as_ref()
                .map(|m| super::format_time(&m.date_time))
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        let me = super::authenticated(&session).await?;
        let poller = super::poller(&session);

        let (chats, friends) = future::try_join(
            poller.load_conversations(),
            api::ListFriends.execute(session.api()),
        )
        .await
        .map_err(|err| super::report_chat(&poller, err))?;

        if chats.is_empty() {
            println!("No conversations yet.");
        } else {
            println!(
                "{}",
                Table::new(chats.iter().map(|c| Row::new(c, &me.id_no)))
                    .with(Style::rounded())
                    .with(Modify::new(Segment::new(1.., 1..=2)).with(Alignment::left()))
            );
        }

        let strangers = chat::friends_without_conversation(&friends, &chats);
        if !strangers.is_empty() {
            println!("Friends you have not talked to yet:");
            for friend in strangers {
                println!(
                    "  {} ({})",
                    friend.friend_details.display_name(),
                    friend.friend_details.id_no
                );
            }
        }
        Ok(())
    }
}
