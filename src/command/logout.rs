// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, session::SessionManager};

/// Forget the stored credentials.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        session.logout().await;
        println!("Logged out.");
        Ok(())
    }
}
