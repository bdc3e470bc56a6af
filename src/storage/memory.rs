// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

use super::{IsPersistent, Key, Storage};

#[derive(Default)]
pub(crate) struct Memory {
    data: RwLock<HashMap<Key, String>>,
}

impl Memory {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl IsPersistent for Memory {
    fn is_persistent(&self) -> bool {
        false
    }
}

#[async_trait]
impl Storage for Memory {
    async fn get(&self, key: Key) -> Result<Option<String>> {
        Ok(self.data.read().await.get(&key).cloned())
    }

    async fn set(&self, key: Key, value: &str) -> Result<()> {
        _ = self.data.write().await.insert(key, value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: Key) -> Result<()> {
        _ = self.data.write().await.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clear_removes_both_keys() -> Result<()> {
        let storage = Memory::new();
        storage.set(Key::AccessToken, "a").await?;
        storage.set(Key::RefreshToken, "r").await?;

        storage.clear().await?;

        assert_eq!(storage.get(Key::AccessToken).await?, None);
        assert_eq!(storage.get(Key::RefreshToken).await?, None);
        Ok(())
    }
}
