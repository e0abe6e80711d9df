use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Mutex,
};

use crate::{
    core::CompanionError,
    persistence,
};

pub const API_KEY_STORAGE_KEY: &str = "MOVE_TO_REVIEW_API_KEY";
pub const KEY_STORE_FILE: &str = "move_to_review.json";

pub trait ApiKeyStore: Send + Sync {
    fn load(&self) -> Option<String>;

    fn save(&self, key: &str) -> Result<(), CompanionError>;
}

/// Interactive recovery when the review API refuses a request.
pub trait KeyPrompt: Send + Sync {
    /// Asks whether the user wants to enter a different key.
    fn confirm_reentry(&self, status: u16, status_text: &str) -> bool;

    /// Asks for the new key; `None` when the user cancels.
    fn request_key(&self) -> Option<String>;
}

/// Key kept in a small JSON map under the app data dir.
#[derive(Debug, Clone)]
pub struct JsonKeyStore {
    path: PathBuf,
}

impl JsonKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_app_data() -> Self {
        Self::new(persistence::get_data_file_path(KEY_STORE_FILE))
    }

    fn entries(&self) -> Result<HashMap<String, String>, CompanionError> {
        persistence::load_json_at(&self.path)
    }
}

impl ApiKeyStore for JsonKeyStore {
    fn load(&self) -> Option<String> {
        self.entries().ok()?.remove(API_KEY_STORAGE_KEY)
    }

    fn save(&self, key: &str) -> Result<(), CompanionError> {
        let mut entries = self.entries().unwrap_or_default();
        entries.insert(API_KEY_STORAGE_KEY.to_string(), key.to_string());
        persistence::save_json_at(&entries, &self.path)
    }
}

#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<String>>,
}

impl MemoryKeyStore {
    pub fn with_key(key: &str) -> Self {
        Self { key: Mutex::new(Some(key.to_string())) }
    }
}

impl ApiKeyStore for MemoryKeyStore {
    fn load(&self) -> Option<String> {
        self.key.lock().ok()?.clone()
    }

    fn save(&self, key: &str) -> Result<(), CompanionError> {
        let mut guard =
            self.key.lock().map_err(|e| CompanionError::Custom(format!("key store poisoned: {e}")))?;
        *guard = Some(key.to_string());
        Ok(())
    }
}
