use serde::Serialize;

pub mod autoplay;
pub mod composer;
pub mod presenter;

pub use autoplay::{
    AutoplayChain,
    AutoplayStep,
    AutoplayTracker,
};
pub use composer::{
    compose,
    Composition,
};
pub use presenter::{
    Presenter,
    PresenterUpdate,
};

pub const HTML_CLASS: &str = "wk-autoplay";
pub const HIDDEN_UNTIL_HOVER_CLASS: &str = "hidden-until-hover";
pub const SECTION_TITLE: &str = "Autoplay Sentences";
pub const OVERFLOW_SUMMARY: &str = "Additional Examples";

/// Stylesheet the presentation layer installs once per page.
pub fn stylesheet() -> String {
    format!(
        ".{HTML_CLASS} .{HIDDEN_UNTIL_HOVER_CLASS}:not(:hover) {{\n  background-color:#ccc;\n  color:#ccc;\n  text-shadow:none;\n}}\n\n.{HTML_CLASS} summary {{\n  display: revert;\n}}\n"
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSource {
    pub content_type: String,
    pub url: String,
}

/// One (pronunciation, voice actor) recording with all of its encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabAudioChoice {
    pub identifier: String,
    pub sources: Vec<AudioSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub text: String,
    pub lang: &'static str,
    pub hidden_until_hover: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Click,
    PointerEnter,
    TouchStart,
}

/// Sentence audio with `preload=none`; the source is attached on first interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LazyAudio {
    pub src: String,
    pub activate_on: Vec<Activation>,
}

impl LazyAudio {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            activate_on: vec![Activation::Click, Activation::PointerEnter, Activation::TouchStart],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentenceSection {
    pub ja: Option<TextLine>,
    pub audio: Option<LazyAudio>,
    pub en: Option<TextLine>,
}

impl SentenceSection {
    pub fn is_empty(&self) -> bool {
        self.ja.is_none() && self.audio.is_none() && self.en.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disclosure {
    pub summary: String,
    pub sections: Vec<SentenceSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderModel {
    pub item_id: u64,
    pub title: String,
    pub class: String,
    pub vocab_audio: Option<VocabAudioChoice>,
    pub sections: Vec<SentenceSection>,
    pub overflow: Option<Disclosure>,
}
