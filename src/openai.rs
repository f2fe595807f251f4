//! OpenAI client configuration with sensible defaults.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
///
/// Falls back to the library's default HTTP client if the timed one cannot be built.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let client = Client::with_config(OpenAIConfig::default());
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(http_client) => client.with_http_client(http_client),
        Err(e) => {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            client
        }
    }
}
