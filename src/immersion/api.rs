use async_trait::async_trait;
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};

use crate::core::{
    http::ensure_success,
    CompanionError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub deck_name: String,
    pub sentence: String,
    #[serde(default)]
    pub sound_url: String,
    #[serde(default)]
    pub translation: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    data: Vec<LookupEntry>,
}

#[derive(Debug, Deserialize)]
struct LookupEntry {
    examples: Vec<Example>,
}

#[async_trait]
pub trait ExampleLookup: Send + Sync {
    /// Examples of the first dictionary entry matching `keyword`.
    async fn look_up(&self, keyword: &str) -> Result<Vec<Example>, CompanionError>;
}

#[derive(Debug, Clone)]
pub struct ImmersionKitClient {
    client: Client,
    endpoint: String,
}

impl ImmersionKitClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }

    fn lookup_url(&self, keyword: &str) -> String {
        format!(
            "{}/look_up_dictionary?keyword={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(keyword)
        )
    }
}

fn first_examples(body: &str) -> Result<Vec<Example>, CompanionError> {
    let response: LookupResponse = serde_json::from_str(body)?;
    response
        .data
        .into_iter()
        .next()
        .map(|entry| entry.examples)
        .ok_or_else(|| CompanionError::Shape("look_up_dictionary returned no data".to_string()))
}

#[async_trait]
impl ExampleLookup for ImmersionKitClient {
    async fn look_up(&self, keyword: &str) -> Result<Vec<Example>, CompanionError> {
        let response = self.client.get(self.lookup_url(keyword)).send().await?;
        ensure_success(&response)?;
        let body = response.text().await?;
        first_examples(&body)
    }
}
