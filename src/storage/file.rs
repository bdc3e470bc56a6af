// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{error::Result, metadata};

use super::{IsPersistent, Key, Storage};

/// Keeps every key in a single JSON object on disk, so the file looks like
/// `{"accessToken": "...", "refreshToken": "..."}`.
pub(crate) struct File {
    path: PathBuf,
    lock: Mutex<()>,
}

impl File {
    pub(crate) fn new<P: AsRef<Path>>(file: P) -> Option<Self> {
        metadata::PROJECT_DIRS
            .as_ref()
            .map(|dirs| Self::at(dirs.data_dir().join(file)))
    }

    pub(crate) fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<Map<String, Value>> {
        match fs::File::open(&self.path) {
            Ok(fp) => Ok(serde_json::from_reader(io::BufReader::new(fp))?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &Map<String, Value>) -> Result<()> {
        if data.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
                Ok(()) | Err(_) => Ok(()),
            };
        }

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // Tokens go to a private temporary file first, so the real one is
        // never readable by others or left half written.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut tmp, data)?;
        tmp.as_file().sync_all()?;
        _ = tmp.persist(&self.path).map_err(io::Error::from)?;
        Ok(())
    }
}

impl IsPersistent for File {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for File {
    async fn get(&self, key: Key) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read()?
            .get(key.as_str())
            .and_then(Value::as_str)
            .map(str::to_owned))
    }

    async fn set(&self, key: Key, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read()?;
        _ = data.insert(key.as_str().to_owned(), value.into());
        self.write(&data)
    }

    async fn remove(&self, key: Key) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read()?;
        if data.remove(key.as_str()).is_some() {
            self.write(&data)?;
        }
        Ok(())
    }
}
