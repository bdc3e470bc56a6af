// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tabled::{settings::Style, Table};

use crate::{
    api::{self, Executor as _},
    error::Result,
    session::SessionManager,
};

/// List your friends.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        _ = super::authenticated(&session).await?;

        let friends = api::ListFriends.execute(session.api()).await?;
        if friends.is_empty() {
            println!("No friends yet.");
        } else {
            println!(
                "{}",
                Table::new(friends.iter().map(|f| &f.friend_details)).with(Style::rounded())
            );
        }
        Ok(())
    }
}
