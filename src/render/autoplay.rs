use serde::Serialize;

use super::VocabAudioChoice;

/// Hidden chains allowed per item: the first one plus one follow-up.
pub const MAX_CHAINS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutoplayStep {
    Vocabulary { audio: VocabAudioChoice },
    Sentence { src: String },
}

/// A hidden playback chain. The first step autoplays, every later step starts
/// when the previous one ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoplayChain {
    pub steps: Vec<AutoplayStep>,
}

impl AutoplayChain {
    pub fn has_sentence(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, AutoplayStep::Sentence { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Per-item record of the hidden chains already handed to the presenter.
#[derive(Debug, Default)]
pub struct AutoplayTracker {
    chains: Vec<AutoplayChain>,
}

impl AutoplayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chains(&self) -> &[AutoplayChain] {
        &self.chains
    }

    /// No new chain once the first one carries sentence audio or a second exists.
    pub fn needs_autoplay(&self) -> bool {
        if self.chains.first().is_some_and(|c| c.has_sentence()) {
            return false;
        }
        self.chains.len() < MAX_CHAINS
    }

    /// Records and returns the next chain, or `None` when autoplay is settled.
    ///
    /// The first chain leads with the vocabulary audio when there is one; any
    /// later chain plays the first sentence directly. A chain is recorded even
    /// when it has nothing to play.
    pub fn plan(
        &mut self,
        vocab: Option<&VocabAudioChoice>,
        first_sentence_audio: Option<&str>,
    ) -> Option<AutoplayChain> {
        if !self.needs_autoplay() {
            return None;
        }

        let mut chain = AutoplayChain::default();
        match vocab {
            Some(audio) if self.chains.is_empty() => {
                chain.steps.push(AutoplayStep::Vocabulary { audio: audio.clone() });
            }
            _ => {}
        }
        if let Some(src) = first_sentence_audio {
            chain.steps.push(AutoplayStep::Sentence { src: src.to_string() });
        }

        self.chains.push(chain.clone());
        Some(chain)
    }
}
