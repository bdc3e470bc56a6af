// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use crate::{api::User, error::Result, session::SessionManager};

/// Start a conversation with a friend.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The friend's ID number.
    #[clap()]
    friend: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        let me = super::authenticated(&session).await?;
        let poller = super::poller(&session);

        let chat_id = poller
            .start_conversation(&self.friend)
            .await
            .map_err(|err| super::report_chat(&poller, err))?;

        let with = poller
            .conversations()
            .iter()
            .find(|c| c.chat_id == chat_id)
            .map(|c| {
                c.others(&me.id_no)
                    .map(User::display_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| self.friend.clone());
        println!("Started conversation {chat_id} with {with}.");
        Ok(())
    }
}
