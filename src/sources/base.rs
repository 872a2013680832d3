use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::FetchError;

const ERROR_BODY_LIMIT: usize = 500;

static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .user_agent(concat!("travel-dash/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("http client")
});

pub fn client() -> &'static Client {
    &CLIENT
}

/// Appends `path` below whatever path `base` already carries, so a base such
/// as `http://host/proxy` keeps its prefix.
pub fn endpoint(base: &str, path: &str) -> Result<Url, FetchError> {
    let mut base_url =
        Url::parse(base).map_err(|err| FetchError::InvalidUrl(format!("{base}: {err}")))?;
    if !base_url.path().ends_with('/') {
        let dir = format!("{}/", base_url.path());
        base_url.set_path(&dir);
    }
    base_url
        .join(path.trim_start_matches('/'))
        .map_err(|err| FetchError::InvalidUrl(format!("{base}{path}: {err}")))
}

/// Sends the request and returns the body of a successful response.
pub fn send(request: RequestBuilder) -> Result<String, FetchError> {
    let response = request
        .send()
        .map_err(|err| FetchError::Network(err.to_string()))?;
    let status = response.status();
    debug!(status = status.as_u16(), url = %response.url(), "response received");
    let body = response
        .text()
        .map_err(|err| FetchError::Network(err.to_string()))?;

    if !status.is_success() {
        return Err(FetchError::Upstream {
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    Ok(body)
}

pub fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body)
        .map_err(|err| FetchError::Malformed(format!("{err}; body: {}", truncate(body))))
}

pub fn truncate(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
