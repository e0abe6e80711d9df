use std::{
    collections::HashSet,
    sync::OnceLock,
};

use regex::Regex;
use tracing::{
    debug,
    warn,
};

use super::{
    api::NoteBridge,
    types::{
        AnkiSettings,
        Note,
        OutField,
    },
};
use crate::{
    core::{
        utils::{
            audio_data_uri,
            ruby_furigana,
        },
        CompanionError,
        CurrentItem,
        Sentence,
    },
    session::SessionContext,
    settings::{
        HideMode,
        Settings,
    },
};

/// Audio reference extracted from a `[sound:...]` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundRef {
    /// `[sound:https://...]`, playable as is (AnkiDroid accepts these too).
    Url(String),
    /// A file in the collection's media folder.
    Media(String),
}

fn sound_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[sound:(.+?)\]").unwrap())
}

pub fn parse_sound_tag(value: &str) -> Option<SoundRef> {
    let filename = sound_regex().captures(value)?.get(1)?.as_str().to_string();
    if filename.contains("://") {
        Some(SoundRef::Url(filename))
    } else {
        Some(SoundRef::Media(filename))
    }
}

fn quote_term(field: &str, value: &str) -> String {
    format!("\"{}:{}\"", field, value.replace('"', "\\\""))
}

/// `"note:<model>" (vocab fields OR'd) (reading fields x readings OR'd)`
pub fn build_query(settings: &AnkiSettings, word: &str, readings: &[String]) -> String {
    let mut parts = vec![format!("\"note:{}\"", settings.model.replace('"', "\\\""))];

    let vocabulary: Vec<String> =
        settings.search_fields.vocabulary.iter().map(|f| quote_term(f, word)).collect();
    if !vocabulary.is_empty() {
        parts.push(format!("({})", vocabulary.join(" OR ")));
    }

    let reading: Vec<String> = readings
        .iter()
        .flat_map(|r| settings.search_fields.reading.iter().map(move |f| quote_term(f, r)))
        .collect();
    if !reading.is_empty() {
        parts.push(format!("({})", reading.join(" OR ")));
    }

    parts.join(" ")
}

/// Reads a note field, applying the ruby transform for furigana fields.
pub fn field_value(note: &Note, name: &str, furigana_fields: &HashSet<String>) -> String {
    let value = note.raw_field(name);
    if furigana_fields.contains(name) {
        ruby_furigana(value)
    } else {
        value.to_string()
    }
}

fn vocabulary_rank(note: &Note, settings: &AnkiSettings) -> usize {
    settings
        .search_fields
        .vocabulary
        .iter()
        .position(|f| !note.raw_field(f).is_empty())
        .unwrap_or(usize::MAX)
}

fn matches_reading(note: &Note, settings: &AnkiSettings, readings: &[String]) -> bool {
    settings
        .search_fields
        .reading
        .iter()
        .flat_map(|f| note.raw_field(f).split('\n'))
        .any(|r| readings.iter().any(|reading| reading == r.trim()))
}

/// Orders candidates by vocabulary field priority and drops reading mismatches.
/// The sort is stable, so equally ranked notes keep their bridge order.
pub fn rank_notes(mut notes: Vec<Note>, settings: &AnkiSettings, readings: &[String]) -> Vec<Note> {
    notes.sort_by_key(|n| vocabulary_rank(n, settings));
    if readings.is_empty() {
        return notes;
    }
    notes.into_iter().filter(|n| matches_reading(n, settings, readings)).collect()
}

fn has_audio_field(note: &Note, out_fields: &[OutField]) -> bool {
    out_fields
        .iter()
        .filter_map(|f| f.audio.as_deref())
        .any(|name| !note.raw_field(name).trim().is_empty())
}

/// First candidate with sentence audio, otherwise the first candidate.
pub fn pick_note<'a>(notes: &'a [Note], settings: &AnkiSettings) -> Option<&'a Note> {
    notes
        .iter()
        .find(|n| has_audio_field(n, &settings.out_fields.sentence))
        .or_else(|| notes.first())
}

pub async fn resolve_audio(
    bridge: &dyn NoteBridge,
    sound: SoundRef,
) -> Result<Option<String>, CompanionError> {
    match sound {
        SoundRef::Url(url) => Ok(Some(url)),
        SoundRef::Media(filename) => {
            let bytes = bridge.retrieve_media_file(&filename).await?;
            Ok(bytes.map(|b| audio_data_uri(&filename, &b)))
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Sentences from the best matching local note, in output-field order.
pub async fn resolve_sentences(
    bridge: &dyn NoteBridge,
    ctx: &SessionContext,
    settings: &Settings,
) -> Result<Vec<Sentence>, CompanionError> {
    let Some(anki) = &settings.anki else {
        return Ok(Vec::new());
    };
    let item: &CurrentItem = ctx.item();

    let query = build_query(anki, &item.word, &item.readings);
    debug!("findNotes query: {}", query);

    let note_ids = bridge.find_notes(&query).await?;
    ctx.ensure_current()?;
    if note_ids.is_empty() {
        return Ok(Vec::new());
    }

    let notes = bridge.notes_info(&note_ids).await?;
    ctx.ensure_current()?;

    let candidates = rank_notes(notes, anki, &item.readings);
    let Some(note) = pick_note(&candidates, anki) else {
        debug!("No note for {} matched readings {:?}", item.word, item.readings);
        return Ok(Vec::new());
    };

    let furigana_fields: HashSet<String> = settings.furigana_fields().into_iter().collect();
    let mut sentences = Vec::new();

    for out in &anki.out_fields.sentence {
        let ja = out.ja.as_deref().and_then(|f| non_empty(field_value(note, f, &furigana_fields)));
        let en = out.en.as_deref().and_then(|f| non_empty(field_value(note, f, &furigana_fields)));

        let mut audio = None;
        if let Some(sound) = out.audio.as_deref().and_then(|f| parse_sound_tag(note.raw_field(f))) {
            match resolve_audio(bridge, sound).await {
                Ok(resolved) => audio = resolved,
                Err(e) => warn!("Could not load sentence audio for note {}: {}", note.note_id, e),
            }
            ctx.ensure_current()?;
        }

        let sentence = Sentence { ja, en, audio };
        let keep_text = sentence.has_ja() && settings.hide_sentence_ja != HideMode::Remove;
        if keep_text || sentence.has_audio() {
            sentences.push(sentence);
        }
    }

    debug!("Resolved {} local sentences for {}", sentences.len(), item.word);
    Ok(sentences)
}
