// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use uuid::Uuid;

use crate::{error::Result, session::SessionManager};

/// Send a message to a conversation.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The conversation ID, as listed by the chats command.
    #[clap()]
    chat: Uuid,

    /// The message to send.
    #[clap()]
    content: String,
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
        _ = poller
            .send(&self.content)
            .await
            .map_err(|err| super::report_chat(&poller, err))?;

        for message in &poller.view().messages {
            println!("{}", super::format_message(message, &me.id_no));
        }
        Ok(())
    }
}
