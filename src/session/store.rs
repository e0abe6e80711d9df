use std::{
    collections::HashMap,
    sync::RwLock,
};

use serde_json::Value;

use crate::core::SessionMode;

pub const CURRENT_ITEM_KEY: &str = "currentItem";
pub const CURRENT_LESSON_KEY: &str = "l/currentLesson";
pub const CURRENT_QUIZ_ITEM_KEY: &str = "l/currentQuizItem";
pub const QUIZ_ACTIVE_KEY: &str = "l/quizActive";
pub const QUESTION_COUNT_KEY: &str = "questionCount";

/// Keys whose change means a new item is (about to be) shown.
pub const WATCHED_KEYS: [&str; 3] = [QUESTION_COUNT_KEY, CURRENT_LESSON_KEY, CURRENT_QUIZ_ITEM_KEY];

/// Read access to the host page's key/value store.
pub trait ItemStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
}

/// Change notification for one store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: String,
}

impl StoreEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn is_item_change(&self) -> bool {
        WATCHED_KEYS.contains(&self.key.as_str())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Store key holding the item on screen for the given mode.
pub fn current_item_key(mode: SessionMode, store: &dyn ItemStore) -> &'static str {
    match mode {
        SessionMode::Lesson | SessionMode::LessonQuiz => {
            let quiz_active = store.get(QUIZ_ACTIVE_KEY).is_some_and(|v| is_truthy(&v));
            if quiz_active {
                CURRENT_QUIZ_ITEM_KEY
            } else {
                CURRENT_LESSON_KEY
            }
        }
        _ => CURRENT_ITEM_KEY,
    }
}

/// In-memory store, fed by the driver binary or by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.into(), value);
        }
    }
}

impl ItemStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok()?.get(key).cloned()
    }
}
