use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    anki::AnkiSettings,
    immersion::ImmersionSettings,
    persistence,
};

pub const SETTINGS_FILE: &str = "settings.json";

/// How a sentence line is shown: always, blurred until hovered, or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHideMode", into = "RawHideMode")]
pub enum HideMode {
    Show,
    Hover,
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawHideMode {
    Flag(bool),
    Word(String),
}

impl TryFrom<RawHideMode> for HideMode {
    type Error = String;

    fn try_from(raw: RawHideMode) -> Result<Self, Self::Error> {
        match raw {
            RawHideMode::Flag(true) => Ok(HideMode::Hover),
            RawHideMode::Flag(false) => Ok(HideMode::Show),
            RawHideMode::Word(word) if word == "remove" => Ok(HideMode::Remove),
            RawHideMode::Word(word) => Err(format!("unknown hide mode '{word}'")),
        }
    }
}

impl From<HideMode> for RawHideMode {
    fn from(mode: HideMode) -> Self {
        match mode {
            HideMode::Show => RawHideMode::Flag(false),
            HideMode::Hover => RawHideMode::Flag(true),
            HideMode::Remove => RawHideMode::Word("remove".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hide_sentence_ja: HideMode,
    pub hide_sentence_en: HideMode,
    pub number_of_sentences: usize,
    /// `None` disables the public lookup.
    pub immersion_kit: Option<ImmersionSettings>,
    /// `None` disables the AnkiConnect lookup.
    pub anki: Option<AnkiSettings>,
    pub log_immersion_kit: bool,
    pub debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hide_sentence_ja: HideMode::Hover,
            hide_sentence_en: HideMode::Remove,
            number_of_sentences: 3,
            immersion_kit: Some(ImmersionSettings::default()),
            anki: Some(AnkiSettings::default()),
            log_immersion_kit: false,
            debounce_ms: 50,
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        persistence::load_json_or_default(SETTINGS_FILE)
    }

    /// Fields whose content carries bracket furigana: the vocabulary search
    /// fields and every sentence output field.
    pub fn furigana_fields(&self) -> Vec<String> {
        let Some(anki) = &self.anki else {
            return Vec::new();
        };

        anki.search_fields
            .vocabulary
            .iter()
            .cloned()
            .chain(anki.out_fields.sentence.iter().filter_map(|f| f.ja.clone()))
            .collect()
    }
}
