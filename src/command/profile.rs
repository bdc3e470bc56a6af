// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use log::error;
use tabled::{settings::Style, Table};

use crate::{
    api,
    error::{Error, Result},
    password::{self, Prompt as _},
    session::SessionManager,
};

/// Update your name, email address or password. Maintainers and developers
/// may also edit other users.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Edit the user with this ID number instead of yourself.
    #[arg(long, value_name = "ID", conflicts_with = "change_password")]
    user: Option<String>,

    /// The new display name.
    #[arg(long)]
    name: Option<String>,

    /// The new email address.
    #[arg(long)]
    email: Option<String>,

    /// Change your password. You will be asked for the current and new
    /// passwords.
    #[arg(long)]
    change_password: bool,
}

impl Command {
    async fn password_change(&self) -> Result<Option<api::PasswordChange>> {
        if !self.change_password {
            return Ok(None);
        }

        let prompt = password::RpasswordPrompt;
        let ask = |label: &'static str| {
            prompt.prompt(password::RequestBuilder::new().with_label(label).into_request())
        };
        let current = ask("Current password").await?.ok_or(Error::Cancelled)?;
        let new = ask("New password").await?.ok_or(Error::Cancelled)?;
        let confirm = ask("Confirm new password").await?.ok_or(Error::Cancelled)?;
        Ok(Some(api::PasswordChange {
            current,
            new,
            confirm,
        }))
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        if self.name.is_none() && self.email.is_none() && !self.change_password {
            error!("Nothing to update; pass --name, --email or --change-password");
            return Err(Error::Command);
        }

        let me = super::authenticated(&session).await?;
        let other = self.user.as_ref().filter(|id_no| **id_no != me.id_no).cloned();
        if let Some(id_no) = other {
            let user = session
                .update_user(api::UpdateUser {
                    id_no,
                    name: self.name,
                    email: self.email,
                })
                .await
                .map_err(|err| match err {
                    Error::NotPrivileged => {
                        error!("Only maintainers and developers may edit other users");
                        err
                    }
                    err => super::report(&session, err),
                })?;

            println!("{}", Table::new([&user]).with(Style::rounded()));
            return Ok(());
        }

        let password = self.password_change().await?;

        let user = session
            .update_profile(api::UpdateMe {
                name: self.name,
                email: self.email,
                password,
            })
            .await
            .map_err(|err| super::report(&session, err))?;

        println!("{}", Table::new([&user]).with(Style::rounded()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_others_excludes_password_changes() {
        let cmd = Command::try_parse_from(["profile", "--user", "2022B4PS0101G", "--name", "Ravi"])
            .unwrap();
        assert_eq!(cmd.user.as_deref(), Some("2022B4PS0101G"));

        assert!(Command::try_parse_from([
            "profile",
            "--user",
            "2022B4PS0101G",
            "--change-password",
        ])
        .is_err());
    }
}
