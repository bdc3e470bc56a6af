// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use clap::Parser;
use log::{debug, warn};
use tokio::{select, signal};
use uuid::Uuid;

use crate::{
    chat::ChatView,
    error::{Error, Internal, Result},
    session::SessionManager,
};

/// Follow a conversation, printing new messages as they arrive, until
/// interrupted.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The conversation ID, as listed by the chats command.
    #[clap()]
    chat: Uuid,
}

fn print_new(view: &ChatView, seen: &mut HashSet<Uuid>, me: &str) -> bool {
    let mut printed = false;
    for message in &view.messages {
        if seen.insert(message.id) {
            println!("{}", super::format_message(message, me));
            printed = true;
        }
    }
    printed
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        let me = super::authenticated(&session).await?;
        let poller = super::poller(&session);
        let mut view = poller.subscribe();
        let mut state = session.subscribe();

        poller
            .select(Some(self.chat))
            .await
            .map_err(|err| super::report_chat(&poller, err))?;

        let mut seen = HashSet::new();
        let mut notice = None;
        loop {
            let current = view.borrow_and_update().clone();
            if print_new(&current, &mut seen, &me.id_no) {
                if let Err(err) = poller.mark_read(&me.id_no).await {
                    warn!("Could not mark messages as read: {}", err);
                }
            }
            if current.notice != notice {
                if let Some(ref message) = current.notice {
                    eprintln!("Error: {message}");
                }
                notice = current.notice;
            }

            select! {
                result = signal::ctrl_c() => {
                    result?;
                    debug!("Interrupted; no longer watching {}", self.chat);
                    return Ok(());
                }
                changed = view.changed() => {
                    changed.map_err(|_| Internal::ChannelClosed)?;
                }
                changed = state.changed() => {
                    changed.map_err(|_| Internal::ChannelClosed)?;
                    if state.borrow_and_update().user.is_none() {
                        return Err(super::report(&session, Error::NotAuthenticated));
                    }
                }
            }
        }
    }
}
