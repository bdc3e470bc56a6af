// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub(crate) use file::File;
pub(crate) use memory::Memory;

/// The fixed slots credentials are persisted under.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    AccessToken,
    RefreshToken,
}

impl Key {
    pub(crate) const ALL: [Self; 2] = [Self::AccessToken, Self::RefreshToken];

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
        }
    }
}

pub(crate) trait IsPersistent {
    fn is_persistent(&self) -> bool;
}

impl<T: IsPersistent + ?Sized> IsPersistent for Box<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}

impl<T: IsPersistent + ?Sized> IsPersistent for Arc<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}

/// String values keyed by [`Key`]. Each call is atomic on its own; callers
/// that need read-modify-write across keys coordinate themselves.
#[async_trait]
pub(crate) trait Storage: Send + Sync + IsPersistent {
    async fn get(&self, key: Key) -> Result<Option<String>>;
    async fn set(&self, key: Key, value: &str) -> Result<()>;
    async fn remove(&self, key: Key) -> Result<()>;

    async fn clear(&self) -> Result<()> {
        for key in Key::ALL {
            self.remove(key).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Box<T> {
    async fn get(&self, key: Key) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: Key, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: Key) -> Result<()> {
        (**self).remove(key).await
    }
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn get(&self, key: Key) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: Key, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: Key) -> Result<()> {
        (**self).remove(key).await
    }
}
