// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::http::Call;

use super::{Executor, User};

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Friend {
    pub(crate) id: i64,
    pub(crate) friend_details: User,
    pub(crate) created_at: Option<DateTime<Utc>>,
}

pub(crate) struct ListFriends;

impl From<ListFriends> for Call {
    fn from(_: ListFriends) -> Self {
        Self::get("/friends/my_friends/")
    }
}

impl Executor for ListFriends {
    type Response = Vec<Friend>;
}
