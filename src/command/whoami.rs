// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tabled::{settings::Style, Table};

use crate::{error::Result, session::SessionManager};

/// Show the account you are logged in as.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        let user = super::authenticated(&session).await?;

        println!("{}", Table::new([&user]).with(Style::rounded()));
        if session.is_developer() {
            println!("You have developer access.");
        } else if session.is_privileged() {
            println!("You have maintainer access.");
        }
        Ok(())
    }
}
