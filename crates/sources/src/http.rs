//! Shared HTTP plumbing for source adapters.

use litscout_core::error::SourceError;
use std::time::Duration;

const USER_AGENT: &str = concat!("litscout/", env!("CARGO_PKG_VERSION"));

/// Build a client that enforces `timeout_secs` on every request.
pub fn build_client(source_name: &str, timeout_secs: u64) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::Network {
            source_name: source_name.into(),
            reason: format!("failed to create HTTP client: {e}"),
        })
}

/// Map a transport error into the source taxonomy.
pub fn map_reqwest_error(source_name: &str, timeout_secs: u64, err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout {
            source_name: source_name.into(),
            timeout_secs,
        }
    } else if let Some(status) = err.status() {
        SourceError::Http {
            source_name: source_name.into(),
            status: status.as_u16(),
        }
    } else {
        SourceError::Network {
            source_name: source_name.into(),
            reason: err.to_string(),
        }
    }
}

/// GET `request` and return the body, failing on non-success statuses.
pub async fn get_text(
    source_name: &str,
    timeout_secs: u64,
    request: reqwest::RequestBuilder,
) -> Result<String, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| map_reqwest_error(source_name, timeout_secs, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Http {
            source_name: source_name.into(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| map_reqwest_error(source_name, timeout_secs, e))
}

/// Decode a JSON body, reporting failures as parse errors.
pub fn parse_json<T: serde::de::DeserializeOwned>(source_name: &str, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Parse {
        source_name: source_name.into(),
        reason: e.to_string(),
    })
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
