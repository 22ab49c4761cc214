//! Flat-file backend: the whole document lives in one pretty-printed JSON
//! file and every operation is a full load → modify → save pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;

use super::model::{Clock, Document, SystemClock, TasteEntry, UserRecord};
use super::traits::TasteStore;
use crate::error::StoreError;

/// One user's entry as read from disk.
///
/// Entries that do not decode as a [`UserRecord`] are carried through saves
/// untouched until the user they belong to changes something.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Decoded(UserRecord),
    Undecoded(Value),
}

impl StoredRecord {
    fn to_record(&self) -> UserRecord {
        match self {
            Self::Decoded(record) => record.clone(),
            Self::Undecoded(value) => salvage_record(value),
        }
    }
}

/// The document with per-record decoding.
type StoredDocument = BTreeMap<String, StoredRecord>;

/// JSON file store.
///
/// Read-modify-write cycles issued through [`TasteStore`] are serialized by
/// an internal lock, so two calls on the same instance never interleave.
/// Other processes writing the same file are not coordinated with.
pub struct JsonFileStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store backed by `path`. The file does not need to exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a file that fails to parse is copied before it gets replaced.
    pub fn corrupt_copy_path(&self) -> PathBuf {
        self.path.with_extension("corrupt")
    }

    /// Read and decode the backing file.
    ///
    /// A missing file is an empty document, not an error. Only text that is
    /// not a JSON object is malformed; a single odd record is decoded as far
    /// as its fields allow.
    pub async fn try_load(&self) -> Result<Document, StoreError> {
        Ok(self
            .try_load_stored()
            .await?
            .iter()
            .map(|(user_id, stored)| (user_id.clone(), stored.to_record()))
            .collect())
    }

    /// Encode and overwrite the backing file, creating parent directories.
    pub async fn try_save(&self, document: &Document) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(document).map_err(|source| self.json_err(source))?;
        self.write_atomic(body).await
    }

    /// Load the document, falling back to an empty one on any error.
    pub async fn load(&self) -> Document {
        match self.try_load().await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Error loading data: {e}");
                Document::new()
            }
        }
    }

    /// Save the document; failures are logged and dropped.
    pub async fn save(&self, document: &Document) {
        if let Err(e) = self.try_save(document).await {
            tracing::error!("Error saving data: {e}");
        }
    }

    async fn try_load_stored(&self) -> Result<StoredDocument, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Data file not found, starting empty");
                return Ok(StoredDocument::new());
            }
            Err(source) => return Err(self.io_err(source)),
        };

        let document: StoredDocument =
            serde_json::from_str(&raw).map_err(|source| self.json_err(source))?;
        for (user_id, stored) in &document {
            if matches!(stored, StoredRecord::Undecoded(_)) {
                tracing::warn!(
                    user_id,
                    path = %self.path.display(),
                    "Record has an unexpected shape"
                );
            }
        }
        Ok(document)
    }

    /// Like [`load`](Self::load), but keeps undecodable records as they are.
    /// A malformed file is copied aside first, since the next save replaces it.
    async fn load_stored(&self) -> StoredDocument {
        match self.try_load_stored().await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Error loading data: {e}");
                if matches!(e, StoreError::Json { .. }) {
                    self.copy_aside().await;
                }
                StoredDocument::new()
            }
        }
    }

    async fn save_stored(&self, document: &StoredDocument) {
        let result = match serde_json::to_string_pretty(document) {
            Ok(body) => self.write_atomic(body).await,
            Err(source) => Err(self.json_err(source)),
        };
        if let Err(e) = result {
            tracing::error!("Error saving data: {e}");
        }
    }

    async fn copy_aside(&self) {
        let target = self.corrupt_copy_path();
        match fs::copy(&self.path, &target).await {
            Ok(_) => tracing::warn!(path = %target.display(), "Unreadable data file copied aside"),
            Err(e) => {
                tracing::error!(path = %target.display(), "Could not copy data file aside: {e}")
            }
        }
    }

    /// Write to a sibling temp file, then rename it over the target, so a
    /// failed write never leaves a truncated document behind.
    async fn write_atomic(&self, body: String) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_err(source))?;
        }

        let tmp = self.path.with_extension("tmp");
        if let Err(source) = fs::write(&tmp, body).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io_err(source));
        }
        if let Err(source) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io_err(source));
        }
        Ok(())
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn json_err(&self, source: serde_json::Error) -> StoreError {
        StoreError::Json {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Keep whichever fields of an odd record still have the expected shape.
fn salvage_record(value: &Value) -> UserRecord {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let tastes = value
        .get("tastes")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| TasteEntry::deserialize(item).ok())
                .collect()
        })
        .unwrap_or_default();

    UserRecord {
        name: text("name"),
        tastes,
        registration_date: text("registration_date"),
    }
}

#[async_trait]
impl TasteStore for JsonFileStore {
    async fn get_or_create_user(&self, user_id: &str) -> UserRecord {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_stored().await;

        if let Some(stored) = document.get(user_id) {
            return stored.to_record();
        }

        let record = UserRecord::new_at(self.clock.now());
        document.insert(user_id.to_string(), StoredRecord::Decoded(record.clone()));
        self.save_stored(&document).await;
        tracing::info!(user_id, "Registered new user record");
        record
    }

    async fn set_name(&self, user_id: &str, name: &str) {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_stored().await;

        let mut record = document
            .get(user_id)
            .map(StoredRecord::to_record)
            .unwrap_or_default();
        record.rename(name, self.clock.now());
        document.insert(user_id.to_string(), StoredRecord::Decoded(record));
        self.save_stored(&document).await;
        tracing::debug!(user_id, "Name updated");
    }

    async fn append_taste(&self, user_id: &str, taste: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_stored().await;

        let Some(stored) = document.get_mut(user_id) else {
            return false;
        };
        let mut record = stored.to_record();
        record
            .tastes
            .push(TasteEntry::recorded_at(taste, self.clock.now()));
        let count = record.tastes.len();
        *stored = StoredRecord::Decoded(record);
        self.save_stored(&document).await;
        tracing::debug!(user_id, count, "Taste appended");
        true
    }

    async fn get_user(&self, user_id: &str) -> Option<UserRecord> {
        let _guard = self.write_lock.lock().await;
        self.load_stored()
            .await
            .get(user_id)
            .map(StoredRecord::to_record)
    }
}
