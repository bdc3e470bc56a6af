// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use crate::{
    api,
    error::{Error, Result},
    password::{self, Prompt},
    session::SessionManager,
};

/// Create a new account. This does not log you in.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Your campus ID number.
    #[arg(long)]
    id: String,

    /// Your campus email address.
    #[arg(long)]
    email: String,

    /// Your full name.
    #[arg(long)]
    name: String,

    /// Read the password and its confirmation from the first two lines of
    /// standard input.
    #[arg(long)]
    password_stdin: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        let prompt: Box<dyn Prompt> = if self.password_stdin {
            Box::new(password::StdinPrompt)
        } else {
            Box::new(password::RpasswordPrompt)
        };

        let password = prompt
            .prompt(password::RequestBuilder::new().into_request())
            .await?
            .ok_or(Error::Cancelled)?;
        let password_confirm = prompt
            .prompt(
                password::RequestBuilder::new()
                    .with_label("Confirm password")
                    .into_request(),
            )
            .await?
            .ok_or(Error::Cancelled)?;

        let user = session
            .register(api::Register {
                id_no: self.id,
                email: self.email,
                name: self.name,
                password,
                password_confirm,
            })
            .await
            .map_err(|err| super::report(&session, err))?;

        println!(
            "Registered {}. You can now log in with your ID number.",
            user.id_no
        );
        Ok(())
    }
}
