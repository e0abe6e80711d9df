use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};

pub const DEFAULT_ANKI_CONNECT_URL: &str = "http://localhost:8765/";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Field {
    pub value: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: u64,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub fields: HashMap<String, Field>,
}

impl Note {
    pub fn raw_field(&self, name: &str) -> &str {
        self.fields.get(name).map(|f| f.value.as_str()).unwrap_or("")
    }
}

/// Note fields searched to find the current vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFields {
    /// In priority order: a note whose earlier field is populated ranks first.
    pub vocabulary: Vec<String>,
    pub reading: Vec<String>,
}

/// Field names that make up one output sentence. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutField {
    #[serde(default)]
    pub ja: Option<String>,
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutFields {
    pub sentence: Vec<OutField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnkiSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub model: String,
    pub search_fields: SearchFields,
    pub out_fields: OutFields,
}

fn default_endpoint() -> String {
    DEFAULT_ANKI_CONNECT_URL.to_string()
}

impl Default for AnkiSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: "yomichan-terms".to_string(),
            search_fields: SearchFields {
                vocabulary: vec!["JapaneseWanikani".to_string(), "Japanese".to_string()],
                reading: vec!["Reading".to_string()],
            },
            out_fields: OutFields {
                sentence: vec![OutField {
                    ja: Some("Sentence".to_string()),
                    en: Some("SentenceMeaning".to_string()),
                    audio: Some("SentenceAudio".to_string()),
                }],
            },
        }
    }
}
