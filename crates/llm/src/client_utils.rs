use crate::LlmError;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

/// Create a JSON request, parse the response.
/// Returns an error on any non-success status code.
pub async fn send_json<T: Serialize, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    data: &T,
    headers: reqwest::header::HeaderMap,
) -> Result<R, LlmError> {
    let response = client.post(url).headers(headers).json(data).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LlmError::StatusCode(
            status,
            response.text().await.unwrap_or_default(),
        ));
    }
    Ok(response.json::<R>().await?)
}
