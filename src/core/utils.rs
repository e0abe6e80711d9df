use std::sync::OnceLock;

use base64::{
    engine::general_purpose::STANDARD,
    Engine,
};
use rand::Rng;
use regex::Regex;
use wana_kana::IsJapaneseStr;

pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

fn furigana_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^ \[\]]+)\[([^\]]*)\]").unwrap())
}

/// Turns Anki bracket furigana (` 食[た]べる`) into ruby markup.
///
/// A base runs back to the previous space, bracket group or start of text. The
/// separating space in front of a base is dropped. Bracket groups whose content
/// is not kana (`[sound:...]`, `[1]`) are left untouched.
pub fn ruby_furigana(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut last_end = 0;

    for caps in furigana_regex().captures_iter(text) {
        let (Some(whole), Some(base), Some(reading)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };

        if reading.as_str().is_empty() || !reading.as_str().is_kana() {
            continue;
        }

        let between = &text[last_end..whole.start()];
        out.push_str(between.strip_suffix(' ').unwrap_or(between));
        out.push_str("<ruby>");
        out.push_str(base.as_str());
        out.push_str("<rt>");
        out.push_str(reading.as_str());
        out.push_str("</rt></ruby>");
        last_end = whole.end();
    }

    out.push_str(&text[last_end..]);
    out
}

/// In-place Fisher-Yates shuffle. Every permutation is equally likely.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

pub fn audio_mime_type(filename: &str) -> &'static str {
    let ext = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_AUDIO_MIME,
    };

    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => DEFAULT_AUDIO_MIME,
    }
}

pub fn audio_data_uri(filename: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", audio_mime_type(filename), STANDARD.encode(bytes))
}
