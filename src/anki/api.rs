use async_trait::async_trait;
use base64::{
    engine::general_purpose::STANDARD,
    Engine,
};
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};

use super::types::Note;
use crate::core::{
    http::ensure_success,
    CompanionError,
};

const ANKI_CONNECT_VERSION: u32 = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<Option<T>, CompanionError> {
        match self.error {
            Some(error) => Err(CompanionError::Bridge(error)),
            None => Ok(self.result),
        }
    }
}

/// `retrieveMediaFile` answers with base64 content, or `false` for a missing file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MediaResult {
    Content(String),
    Missing(bool),
}

/// The subset of AnkiConnect actions the sentence lookup relies on.
#[async_trait]
pub trait NoteBridge: Send + Sync {
    async fn find_notes(&self, query: &str) -> Result<Vec<u64>, CompanionError>;

    async fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<Note>, CompanionError>;

    /// Raw bytes of a file in the collection's media folder.
    async fn retrieve_media_file(&self, filename: &str)
        -> Result<Option<Vec<u8>>, CompanionError>;
}

#[derive(Debug, Clone)]
pub struct AnkiClient {
    client: Client,
    endpoint: String,
}

impl AnkiClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }

    async fn make_request<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        params: Option<serde_json::Value>,
    ) -> Result<ApiResponse<T>, CompanionError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), serde_json::Value::String(action.to_string()));
        body.insert("version".to_string(), serde_json::Value::Number(ANKI_CONNECT_VERSION.into()));

        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        ensure_success(&response)?;

        Ok(response.json().await?)
    }

    /// Used to check whether AnkiConnect is online.
    pub async fn version(&self) -> Result<u32, CompanionError> {
        let response: ApiResponse<u32> = self.make_request("version", None).await?;
        Ok(response.into_result()?.unwrap_or_default())
    }
}

#[async_trait]
impl NoteBridge for AnkiClient {
    async fn find_notes(&self, query: &str) -> Result<Vec<u64>, CompanionError> {
        let params = serde_json::json!({ "query": query });
        let response: ApiResponse<Vec<u64>> = self.make_request("findNotes", Some(params)).await?;
        Ok(response.into_result()?.unwrap_or_default())
    }

    async fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<Note>, CompanionError> {
        let params = serde_json::json!({ "notes": note_ids });
        let response: ApiResponse<Vec<Note>> = self.make_request("notesInfo", Some(params)).await?;
        Ok(response.into_result()?.unwrap_or_default())
    }

    async fn retrieve_media_file(
        &self,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, CompanionError> {
        let params = serde_json::json!({ "filename": filename });
        let response: ApiResponse<MediaResult> =
            self.make_request("retrieveMediaFile", Some(params)).await?;

        match response.into_result()? {
            Some(MediaResult::Content(encoded)) => Ok(Some(STANDARD.decode(encoded.trim())?)),
            Some(MediaResult::Missing(_)) | None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_error_is_surfaced() {
        let response: ApiResponse<Vec<u64>> =
            serde_json::from_str(r#"{ "result": null, "error": "collection is not available" }"#)
                .unwrap();
        assert!(matches!(response.into_result(), Err(CompanionError::Bridge(_))));

        let response: ApiResponse<Vec<u64>> =
            serde_json::from_str(r#"{ "result": [1, 2], "error": null }"#).unwrap();
        assert_eq!(response.into_result().unwrap(), Some(vec![1, 2]));
    }

    #[test]
    fn test_media_result_shapes() {
        let found: ApiResponse<MediaResult> =
            serde_json::from_str(r#"{ "result": "SUQz", "error": null }"#).unwrap();
        assert!(matches!(found.result, Some(MediaResult::Content(ref s)) if s == "SUQz"));

        let missing: ApiResponse<MediaResult> =
            serde_json::from_str(r#"{ "result": false, "error": null }"#).unwrap();
        assert!(matches!(missing.result, Some(MediaResult::Missing(false))));
    }

    #[test]
    fn test_notes_info_parsing() {
        let json = r#"[{
            "noteId": 1502298033753,
            "profile": "User 1",
            "modelName": "yomichan-terms",
            "tags": ["wanikani"],
            "fields": {
                "Japanese": { "value": "食べる", "order": 0 },
                "Reading": { "value": "たべる", "order": 1 }
            },
            "mod": 1718377864,
            "cards": [1498938915662]
        }]"#;

        let notes: Vec<Note> = serde_json::from_str(json).unwrap();
        assert_eq!(notes[0].note_id, 1502298033753);
        assert_eq!(notes[0].raw_field("Reading"), "たべる");
        assert_eq!(notes[0].raw_field("Missing"), "");
    }
}
