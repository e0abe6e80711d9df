use std::time::Duration;

use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        USER_AGENT,
    },
    Client,
    Response,
};

use crate::core::CompanionError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub fn http_client() -> Result<Client, CompanionError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("wk-companion/0.2 (+reqwest)"));

    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .default_headers(headers)
        .build()
        .map_err(|e| CompanionError::Custom(format!("HTTP client build failed: {e}")))
}

pub fn ensure_success(resp: &Response) -> Result<(), CompanionError> {
    if !resp.status().is_success() {
        return Err(CompanionError::Custom(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }
    Ok(())
}
