use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

pub mod api;

pub use api::{
    Example,
    ExampleLookup,
    ImmersionKitClient,
};

use crate::{
    core::{
        utils::shuffle,
        CompanionError,
        Sentence,
    },
    session::SessionContext,
    settings::Settings,
};

pub const DEFAULT_IMMERSION_KIT_URL: &str = "https://api.immersionkit.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmersionSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Deck names whose examples come first, in this order.
    #[serde(default)]
    pub priority: Vec<String>,
}

fn default_endpoint() -> String {
    DEFAULT_IMMERSION_KIT_URL.to_string()
}

impl Default for ImmersionSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            priority: [
                "Death Note",
                "Hunter x Hunter",
                "Fullmetal Alchemist Brotherhood",
                "Kino's Journey",
                "Your Name",
                "Bakemonogatari",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub deck_name: String,
    pub prioritized: bool,
    pub examples: Vec<Example>,
}

/// Splits examples into one bucket per priority deck (in priority order), then
/// one bucket per remaining deck in first-seen order. Bucket contents keep the
/// original relative order.
pub fn partition_examples(examples: Vec<Example>, priority: &[String]) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = priority
        .iter()
        .map(|p| Bucket { deck_name: p.clone(), prioritized: true, examples: Vec::new() })
        .collect();

    for example in examples {
        match buckets.iter().position(|b| b.deck_name == example.deck_name) {
            Some(index) => buckets[index].examples.push(example),
            None => buckets.push(Bucket {
                deck_name: example.deck_name.clone(),
                prioritized: false,
                examples: vec![example],
            }),
        }
    }

    buckets
}

/// Shuffles every bucket and concatenates them in bucket order.
pub fn order_examples<R: Rng + ?Sized>(
    examples: Vec<Example>,
    priority: &[String],
    rng: &mut R,
) -> Vec<Example> {
    partition_examples(examples, priority)
        .into_iter()
        .flat_map(|mut bucket| {
            shuffle(&mut bucket.examples, rng);
            bucket.examples
        })
        .collect()
}

impl From<Example> for Sentence {
    fn from(example: Example) -> Self {
        Sentence {
            ja: Some(format!("{} ({})", example.sentence, example.deck_name)),
            en: Some(example.translation).filter(|t| !t.is_empty()),
            audio: Some(example.sound_url).filter(|u| !u.is_empty()),
        }
    }
}

pub async fn resolve_sentences(
    lookup: &dyn ExampleLookup,
    ctx: &SessionContext,
    settings: &Settings,
) -> Result<Vec<Sentence>, CompanionError> {
    let Some(immersion) = &settings.immersion_kit else {
        return Ok(Vec::new());
    };

    let examples = lookup.look_up(&ctx.item().word).await?;
    ctx.ensure_current()?;

    if settings.log_immersion_kit {
        let buckets = partition_examples(examples.clone(), &immersion.priority);
        for bucket in &buckets {
            info!(
                deck = %bucket.deck_name,
                prioritized = bucket.prioritized,
                "{} examples",
                bucket.examples.len()
            );
        }
    }

    let ordered = order_examples(examples, &immersion.priority, &mut rand::rng());
    debug!("Resolved {} ImmersionKit sentences for {}", ordered.len(), ctx.item().word);

    Ok(ordered.into_iter().map(Sentence::from).collect())
}
