// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use uuid::Uuid;

use crate::{error::Result, session::SessionManager};

/// Delete a conversation and all of its messages.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The conversation ID, as listed by the chats command.
    #[clap()]
    chat: Uuid,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        _ = super::authenticated(&session).await?;
        let poller = super::poller(&session);

        poller
            .select(Some(self.chat))
            .await
            .map_err(|err| super::report_chat(&poller, err))?;
        poller
            .delete_selected()
            .await
            .map_err(|err| super::report_chat(&poller, err))?;

        println!("Deleted conversation {}.", self.chat);
        Ok(())
    }
}
