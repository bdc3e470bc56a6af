// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Duration,
};

use log::{debug, info, warn};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    api::{self, Chat, Executor as _, Friend, Message},
    error::{Error, Result},
    http::ApiClient,
};

const LOAD_CONVERSATIONS_FAILED: &str = "Failed to load chat data. Please try again later.";
const LOAD_MESSAGES_FAILED: &str = "Failed to load messages. Please try again.";
const SEND_FAILED: &str = "Failed to send message. Please try again.";
const START_FAILED: &str = "Failed to start conversation. Please try again.";
const DELETE_FAILED: &str = "Failed to delete conversation. Please try again.";

#[derive(Copy, Clone, Debug)]
pub(crate) struct PollConfig {
    pub(crate) interval: Duration,
    pub(crate) notice_lifetime: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            notice_lifetime: Duration::from_millis(3000),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ChatView {
    pub(crate) conversations: Vec<Chat>,
    pub(crate) selected: Option<Uuid>,
    pub(crate) messages: Vec<Message>,
    pub(crate) loading: bool,
    pub(crate) notice: Option<String>,
}

/// How a message fetch reports itself. Visible fetches drive the loading
/// flag and surface failures; silent ones only log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Fetch {
    Visible,
    Silent,
}

#[derive(Default)]
struct Selection {
    chat_id: Option<Uuid>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    api: Arc<ApiClient>,
    config: PollConfig,
    view: watch::Sender<ChatView>,
    selection: Mutex<Selection>,
    notices: AtomicU64,
}

/// Keeps the selected conversation's messages approximately live by
/// re-fetching them on a timer.
pub(crate) struct ChatPoller {
    shared: Arc<Shared>,
}

impl ChatPoller {
    pub(crate) fn new(api: Arc<ApiClient>, config: PollConfig) -> Self {
        let (view, _) = watch::channel(ChatView::default());
        Self {
            shared: Arc::new(Shared {
                api,
                config,
                view,
                selection: Mutex::default(),
                notices: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn view(&self) -> ChatView {
        self.shared.view.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.shared.view.subscribe()
    }

    pub(crate) fn conversations(&self) -> Vec<Chat> {
        self.shared.view.borrow().conversations.clone()
    }

    pub(crate) async fn load_conversations(&self) -> Result<Vec<Chat>> {
        match api::ListChats.execute(&self.shared.api).await {
            Ok(chats) => {
                self.shared
                    .view
                    .send_modify(|v| v.conversations = chats.clone());
                Ok(chats)
            }
            Err(err) => {
                warn!("Could not load conversations: {}", err);
                self.shared.notify(LOAD_CONVERSATIONS_FAILED);
                Err(err)
            }
        }
    }

    /// Changes the selected conversation. Any running poll is cancelled; a
    /// new one starts for `chat_id` after an immediate visible fetch.
    pub(crate) async fn select(&self, chat_id: Option<Uuid>) -> Result<()> {
        let generation = {
            let mut selection = self.shared.selection();
            if let Some(task) = selection.task.take() {
                task.abort();
            }
            selection.generation += 1;
            selection.chat_id = chat_id;
            if let Some(chat_id) = chat_id {
                selection.task = Some(self.shared.spawn_poll(chat_id, selection.generation));
            }
            selection.generation
        };

        self.shared.view.send_modify(|v| {
            if v.selected != chat_id {
                v.messages.clear();
            }
            v.selected = chat_id;
            v.loading = false;
        });

        match chat_id {
            Some(chat_id) => {
                debug!("Selected conversation {} (generation {})", chat_id, generation);
                self.shared.fetch(chat_id, generation, Fetch::Visible).await
            }
            None => Ok(()),
        }
    }

    /// Sends `content` to the selected conversation and refetches its
    /// messages straight away.
    pub(crate) async fn send(&self, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let (chat_id, generation) = self.shared.current()?;

        let sent = api::SendMessage {
            chat_id,
            content: content.to_owned(),
        }
        .execute(&self.shared.api)
        .await
        .map_err(|err| {
            warn!("Could not send message to {}: {}", chat_id, err);
            self.shared.notify(SEND_FAILED);
            err
        })?;

        // The refetch reports its own failure; the message is sent either way.
        _ = self
            .shared
            .fetch(chat_id, generation, Fetch::Visible)
            .await;
        Ok(sent)
    }

    /// Marks every unread message not sent by `me` in the current view as
    /// read.
    pub(crate) async fn mark_read(&self, me: &str) -> Result<()> {
        let message_ids: Vec<Uuid> = self
            .shared
            .view
            .borrow()
            .messages
            .iter()
            .filter(|m| !m.is_read && m.sender.id_no != me)
            .map(|m| m.id)
            .collect();
        if message_ids.is_empty() {
            return Ok(());
        }

        _ = api::MarkRead {
            message_ids: message_ids.clone(),
        }
        .execute(&self.shared.api)
        .await?;
        self.shared.view.send_modify(|v| {
            for message in &mut v.messages {
                if message_ids.contains(&message.id) {
                    message.is_read = true;
                }
            }
        });
        Ok(())
    }

    /// Opens a direct conversation with a friend and selects it.
    pub(crate) async fn start_conversation(&self, friend_id: &str) -> Result<Uuid> {
        let result = async {
            let created = api::CreateDirectChat {
                participant: friend_id.to_owned(),
            }
            .execute(&self.shared.api)
            .await?;
            let chats = api::ListChats.execute(&self.shared.api).await?;
            let found = chats.iter().any(|c| c.chat_id == created.chat_id);
            self.shared
                .view
                .send_modify(|v| v.conversations = chats);
            Ok::<_, Error>((created.chat_id, found))
        }
        .await;

        match result {
            Ok((chat_id, found)) => {
                info!("Started conversation {} with {}", chat_id, friend_id);
                if found {
                    self.select(Some(chat_id)).await?;
                }
                Ok(chat_id)
            }
            Err(err) => {
                warn!("Could not start a conversation with {}: {}", friend_id, err);
                self.shared.notify(START_FAILED);
                Err(err)
            }
        }
    }

    /// Deletes the selected conversation, with its messages, and clears the
    /// selection.
    pub(crate) async fn delete_selected(&self) -> Result<()> {
        let (chat_id, _) = self.shared.current()?;

        let result = async {
            api::DeleteChat { chat_id }
                .execute(&self.shared.api)
                .await?;
            api::ListChats.execute(&self.shared.api).await
        }
        .await;

        match result {
            Ok(chats) => {
                info!("Deleted conversation {}", chat_id);
                self.shared
                    .view
                    .send_modify(|v| v.conversations = chats);
                self.select(None).await
            }
            Err(err) => {
                warn!("Could not delete conversation {}: {}", chat_id, err);
                self.shared.notify(DELETE_FAILED);
                Err(err)
            }
        }
    }
}

impl Drop for ChatPoller {
    fn drop(&mut self) {
        if let Some(task) = self.shared.selection().task.take() {
            task.abort();
        }
    }
}

impl Shared {
    fn selection(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> Result<(Uuid, u64)> {
        let selection = self.selection();
        selection
            .chat_id
            .map(|chat_id| (chat_id, selection.generation))
            .ok_or(Error::NoConversation)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.selection().generation == generation
    }

    fn spawn_poll(self: &Arc<Self>, chat_id: Uuid, generation: u64) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let period = self.config.interval;
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                _ = ticker.tick().await;
                if !shared.is_current(generation) {
                    break;
                }
                _ = shared.fetch(chat_id, generation, Fetch::Silent).await;
            }
        })
    }

    async fn fetch(self: &Arc<Self>, chat_id: Uuid, generation: u64, mode: Fetch) -> Result<()> {
        if mode == Fetch::Visible && self.is_current(generation) {
            self.view.send_modify(|v| v.loading = true);
        }

        let result = api::GetChatMessages { chat_id }
            .execute(&self.api)
            .await
            .map(api::MessagesPayload::into_messages);

        if !self.is_current(generation) {
            debug!("Discarding messages for {} from a superseded selection", chat_id);
            return Ok(());
        }

        match result {
            Ok(messages) => {
                self.view.send_modify(|v| {
                    v.messages = messages;
                    if mode == Fetch::Visible {
                        v.loading = false;
                    }
                });
                Ok(())
            }
            Err(err) if mode == Fetch::Silent => {
                warn!("Polling messages for {} failed: {}", chat_id, err);
                Ok(())
            }
            Err(err) => {
                warn!("Could not load messages for {}: {}", chat_id, err);
                self.view.send_modify(|v| v.loading = false);
                self.notify(LOAD_MESSAGES_FAILED);
                Err(err)
            }
        }
    }

    /// Shows `message` until the notice lifetime passes or a newer notice
    /// replaces it.
    fn notify(self: &Arc<Self>, message: &str) {
        let id = self.notices.fetch_add(1, Ordering::SeqCst) + 1;
        self.view
            .send_modify(|v| v.notice = Some(message.to_owned()));

        let shared: Weak<Self> = Arc::downgrade(self);
        let lifetime = self.config.notice_lifetime;
        drop(tokio::spawn(async move {
            time::sleep(lifetime).await;
            if let Some(shared) = shared.upgrade() {
                if shared.notices.load(Ordering::SeqCst) == id {
                    shared.view.send_modify(|v| v.notice = None);
                }
            }
        }));
    }
}

/// Friends who do not share a conversation with the current user yet.
pub(crate) fn friends_without_conversation<'friends>(
    friends: &'friends [Friend],
    conversations: &[Chat],
) -> Vec<&'friends Friend> {
    friends
        .iter()
        .filter(|f| {
            !conversations
                .iter()
                .any(|c| c.has_participant(&f.friend_details.id_no))
        })
        .collect()
}
