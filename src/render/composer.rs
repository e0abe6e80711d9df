use rand::Rng;

use super::{
    autoplay::{
        AutoplayChain,
        AutoplayTracker,
    },
    AudioSource,
    Disclosure,
    LazyAudio,
    RenderModel,
    SentenceSection,
    TextLine,
    VocabAudioChoice,
    HTML_CLASS,
    OVERFLOW_SUMMARY,
    SECTION_TITLE,
};
use crate::{
    core::{
        CurrentItem,
        Sentence,
    },
    settings::{
        HideMode,
        Settings,
    },
};

/// Output of one composer pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// `None` when nothing is worth showing; the insertion point is dropped.
    pub model: Option<RenderModel>,
    /// A new hidden chain to start, if this pass created one.
    pub autoplay: Option<AutoplayChain>,
}

/// Groups the vocabulary recordings by (pronunciation, voice actor) and picks one.
pub fn pick_vocab_audio<R: Rng + ?Sized>(
    item: &CurrentItem,
    rng: &mut R,
) -> Option<VocabAudioChoice> {
    let mut groups: Vec<VocabAudioChoice> = Vec::new();

    for audio in &item.audio {
        let identifier = format!("{}:{}", audio.pronunciation, audio.voice_actor_id);
        let source = AudioSource { content_type: audio.content_type.clone(), url: audio.url.clone() };

        match groups.iter_mut().find(|g| g.identifier == identifier) {
            Some(group) => group.sources.push(source),
            None => groups.push(VocabAudioChoice { identifier, sources: vec![source] }),
        }
    }

    if groups.is_empty() {
        return None;
    }
    let n = rng.random_range(0..groups.len());
    Some(groups.swap_remove(n))
}

fn text_line(text: Option<&str>, mode: HideMode, lang: &'static str) -> Option<TextLine> {
    let text = text.filter(|t| !t.is_empty())?;
    if mode == HideMode::Remove {
        return None;
    }
    Some(TextLine { text: text.to_string(), lang, hidden_until_hover: mode == HideMode::Hover })
}

fn section(sentence: &Sentence, settings: &Settings) -> SentenceSection {
    SentenceSection {
        ja: text_line(sentence.ja.as_deref(), settings.hide_sentence_ja, "ja"),
        audio: sentence.audio.as_deref().filter(|a| !a.is_empty()).map(LazyAudio::new),
        en: text_line(sentence.en.as_deref(), settings.hide_sentence_en, "en"),
    }
}

fn sections(sentences: &[Sentence], settings: &Settings) -> Vec<SentenceSection> {
    sentences.iter().map(|s| section(s, settings)).filter(|s| !s.is_empty()).collect()
}

/// Builds the render model for `item` from every sentence resolved so far and
/// plans the hidden autoplay chain.
///
/// Safe to call repeatedly for the same item: the model is rebuilt from scratch
/// each time and `tracker` caps the number of chains.
pub fn compose<R: Rng + ?Sized>(
    item: &CurrentItem,
    sentences: &[Sentence],
    settings: &Settings,
    tracker: &mut AutoplayTracker,
    rng: &mut R,
) -> Composition {
    let vocab_audio = pick_vocab_audio(item, rng);

    let split = settings.number_of_sentences.min(sentences.len());
    let (visible, rest) = sentences.split_at(split);

    let visible_sections = sections(visible, settings);
    let first_sentence_audio =
        visible_sections.iter().find_map(|s| s.audio.as_ref()).map(|a| a.src.clone());

    let autoplay = tracker.plan(vocab_audio.as_ref(), first_sentence_audio.as_deref());

    let overflow_sections = sections(rest, settings);
    let has_sentences = !visible_sections.is_empty() || !overflow_sections.is_empty();

    let overflow = if overflow_sections.is_empty() {
        None
    } else {
        Some(Disclosure { summary: OVERFLOW_SUMMARY.to_string(), sections: overflow_sections })
    };

    let model = has_sentences.then(|| RenderModel {
        item_id: item.id,
        title: SECTION_TITLE.to_string(),
        class: HTML_CLASS.to_string(),
        vocab_audio,
        sections: visible_sections,
        overflow,
    });

    Composition { model, autoplay }
}

#[cfg(test)]
mod tests {
    use rand::{
        rngs::StdRng,
        SeedableRng,
    };

    use super::*;
    use crate::{
        core::VocabAudio,
        render::AutoplayStep,
    };

    fn item_with_audio() -> CurrentItem {
        let audio = |pronunciation: &str, actor: u64, content_type: &str, ext: &str| VocabAudio {
            pronunciation: pronunciation.to_string(),
            voice_actor_id: actor,
            content_type: content_type.to_string(),
            url: format!("https://cdn.example/{pronunciation}-{actor}.{ext}"),
        };

        CurrentItem {
            id: 2467,
            word: "食べる".to_string(),
            readings: vec!["たべる".to_string()],
            audio: vec![
                audio("たべる", 1, "audio/mpeg", "mp3"),
                audio("たべる", 1, "audio/ogg", "ogg"),
                audio("たべる", 2, "audio/mpeg", "mp3"),
                audio("たべる", 2, "audio/ogg", "ogg"),
            ],
        }
    }

    fn sentence(n: usize, audio: bool) -> Sentence {
        Sentence {
            ja: Some(format!("例文{n}")),
            en: Some(format!("Example {n}")),
            audio: audio.then(|| format!("https://a/{n}.mp3")),
        }
    }

    #[test]
    fn test_pick_vocab_audio_groups_variants() {
        let item = item_with_audio();
        let mut rng = StdRng::seed_from_u64(1);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let choice = pick_vocab_audio(&item, &mut rng).unwrap();
            assert_eq!(choice.sources.len(), 2);
            seen.insert(choice.identifier);
        }
        assert_eq!(seen.len(), 2);

        let silent = CurrentItem { audio: Vec::new(), ..item };
        assert!(pick_vocab_audio(&silent, &mut rng).is_none());
    }

    #[test]
    fn test_single_sentence_with_vocab_chain() {
        let item = item_with_audio();
        let mut tracker = AutoplayTracker::new();
        let mut rng = StdRng::seed_from_u64(9);

        let composition =
            compose(&item, &[sentence(0, true)], &Settings::default(), &mut tracker, &mut rng);

        let model = composition.model.unwrap();
        assert_eq!(model.sections.len(), 1);
        assert!(model.overflow.is_none());
        assert!(model.vocab_audio.is_some());

        let section = &model.sections[0];
        assert!(section.ja.as_ref().unwrap().hidden_until_hover);
        // English is removed by default
        assert!(section.en.is_none());

        let chain = composition.autoplay.unwrap();
        assert!(matches!(chain.steps[0], AutoplayStep::Vocabulary { .. }));
        assert_eq!(chain.steps[1], AutoplayStep::Sentence { src: "https://a/0.mp3".to_string() });
    }

    #[test]
    fn test_overflow_goes_into_disclosure() {
        let item = item_with_audio();
        let sentences: Vec<Sentence> = (0..5).map(|n| sentence(n, n > 0)).collect();
        let settings = Settings { hide_sentence_en: HideMode::Show, ..Settings::default() };

        let composition = compose(
            &item,
            &sentences,
            &settings,
            &mut AutoplayTracker::new(),
            &mut StdRng::seed_from_u64(0),
        );
        let model = composition.model.unwrap();

        assert_eq!(model.sections.len(), 3);
        let overflow = model.overflow.unwrap();
        assert_eq!(overflow.summary, OVERFLOW_SUMMARY);
        assert_eq!(overflow.sections.len(), 2);
        assert!(!model.sections[0].en.as_ref().unwrap().hidden_until_hover);

        // First visible sentence with audio is the second one
        let chain = composition.autoplay.unwrap();
        assert_eq!(chain.steps[1], AutoplayStep::Sentence { src: "https://a/1.mp3".to_string() });
    }

    #[test]
    fn test_repeated_compose_keeps_one_extra_chain() {
        let item = item_with_audio();
        let settings = Settings::default();
        let mut tracker = AutoplayTracker::new();
        let mut rng = StdRng::seed_from_u64(5);

        // First pass: text only, so the chain has vocabulary audio alone
        let mut sentences = vec![sentence(0, false)];
        let first = compose(&item, &sentences, &settings, &mut tracker, &mut rng);
        assert_eq!(first.autoplay.unwrap().steps.len(), 1);

        sentences.push(sentence(1, true));
        sentences.push(sentence(2, true));
        for _ in 0..5 {
            let again = compose(&item, &sentences, &settings, &mut tracker, &mut rng);
            assert_eq!(again.model.unwrap().sections.len(), 3);
        }
        assert_eq!(tracker.chains().len(), 2);
        assert_eq!(
            tracker.chains()[1].steps,
            vec![AutoplayStep::Sentence { src: "https://a/1.mp3".to_string() }]
        );
    }

    #[test]
    fn test_nothing_to_show() {
        let item = item_with_audio();
        let settings = Settings { hide_sentence_ja: HideMode::Remove, ..Settings::default() };
        let text_only = vec![Sentence { ja: Some("例文".to_string()), en: None, audio: None }];

        let composition = compose(
            &item,
            &text_only,
            &settings,
            &mut AutoplayTracker::new(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(composition.model.is_none());
        // The vocabulary audio still autoplays
        assert_eq!(composition.autoplay.unwrap().steps.len(), 1);
    }
}
