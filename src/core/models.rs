use serde::{
    Deserialize,
    Serialize,
};

/// A vocabulary item as published by the review page's store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentItem {
    pub id: u64,
    #[serde(rename = "voc")]
    pub word: String,
    #[serde(rename = "kana", default)]
    pub readings: Vec<String>,
    #[serde(rename = "aud", default)]
    pub audio: Vec<VocabAudio>,
}

impl CurrentItem {
    /// Parses a raw store value. Anything that is not a vocabulary item yields `None`.
    pub fn from_store_value(value: &serde_json::Value) -> Option<Self> {
        if value.get("voc").is_none() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabAudio {
    pub pronunciation: String,
    pub voice_actor_id: u64,
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub ja: Option<String>,
    pub en: Option<String>,
    pub audio: Option<String>,
}

impl Sentence {
    pub fn has_audio(&self) -> bool {
        self.audio.as_deref().is_some_and(|a| !a.is_empty())
    }

    pub fn has_ja(&self) -> bool {
        self.ja.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Review,
    ExtraStudy,
    Lesson,
    LessonQuiz,
    ItemPage,
}

impl SessionMode {
    /// Detects the session mode from a page URL. Lesson pages report `Lesson`;
    /// the quiz sub-mode is only known from the store.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.contains("/review/session") {
            Some(SessionMode::Review)
        } else if url.contains("/extra_study/session") {
            Some(SessionMode::ExtraStudy)
        } else if url.contains("/lesson/session") {
            Some(SessionMode::Lesson)
        } else if ["/vocabulary/", "/kanji/", "/radicals/"].iter().any(|p| url.contains(p)) {
            Some(SessionMode::ItemPage)
        } else {
            None
        }
    }

    pub fn runs_autoplay(&self) -> bool {
        !matches!(self, SessionMode::ItemPage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_from_store_value() {
        let value = serde_json::json!({
            "id": 2467,
            "voc": "食べる",
            "kana": ["たべる"],
            "aud": [{
                "pronunciation": "たべる",
                "voice_actor_id": 1,
                "content_type": "audio/mpeg",
                "url": "https://cdn.example/taberu.mp3"
            }],
            "en": ["To Eat"]
        });

        let item = CurrentItem::from_store_value(&value).unwrap();
        assert_eq!(item.id, 2467);
        assert_eq!(item.word, "食べる");
        assert_eq!(item.readings, vec!["たべる"]);
        assert_eq!(item.audio.len(), 1);

        // Kanji items have no "voc" key and are skipped
        let kanji = serde_json::json!({ "id": 1, "kan": "食", "on": ["しょく"] });
        assert!(CurrentItem::from_store_value(&kanji).is_none());
    }

    #[test]
    fn test_session_mode_from_url() {
        assert_eq!(
            SessionMode::from_url("https://www.wanikani.com/review/session"),
            Some(SessionMode::Review)
        );
        assert_eq!(
            SessionMode::from_url("https://www.wanikani.com/lesson/session?x=1"),
            Some(SessionMode::Lesson)
        );
        assert_eq!(
            SessionMode::from_url("https://www.wanikani.com/vocabulary/食べる"),
            Some(SessionMode::ItemPage)
        );
        assert_eq!(SessionMode::from_url("https://www.wanikani.com/dashboard"), None);
        assert!(!SessionMode::ItemPage.runs_autoplay());
    }
}
