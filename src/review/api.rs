use async_trait::async_trait;
use reqwest::{
    header::AUTHORIZATION,
    Client,
    Method,
};

use crate::core::CompanionError;

pub const WANIKANI_API_URL: &str = "https://api.wanikani.com/v2";
pub const WANIKANI_REVISION: &str = "20170710";

/// Status line and body of a review API call, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

#[async_trait]
pub trait ReviewTransport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        api_key: Option<&str>,
    ) -> Result<ApiReply, CompanionError>;
}

#[derive(Debug, Clone)]
pub struct WaniKaniClient {
    client: Client,
    base_url: String,
}

impl WaniKaniClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl ReviewTransport for WaniKaniClient {
    async fn send(
        &self,
        method: Method,
        path: &str,
        api_key: Option<&str>,
    ) -> Result<ApiReply, CompanionError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", api_key.unwrap_or_default()))
            .header("Wanikani-Revision", WANIKANI_REVISION)
            .send()
            .await?;

        let status = response.status();
        Ok(ApiReply {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: response.text().await?,
        })
    }
}
