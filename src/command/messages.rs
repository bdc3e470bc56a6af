// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use log::warn;
use uuid::Uuid;

use crate::{error::Result, session::SessionManager};

/// Show the messages of a conversation and mark them as read.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The conversation ID, as listed by the chats command.
    #[clap()]
    chat: Uuid,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        let me = super::authenticated(&session).await?;
        let poller = super::poller(&session);

        poller
            .select(Some(self.chat))
            .await
            .map_err(|err| super::report_chat(&poller, err))?;

        let view = poller.view();
        if view.messages.is_empty() {
            println!("No messages yet.");
        }
        for message in &view.messages {
            println!("{}", super::format_message(message, &me.id_no));
        }

        if let Err(err) = poller.mark_read(&me.id_no).await {
            warn!("Could not mark messages as read: {}", err);
        }
        Ok(())
    }
}
