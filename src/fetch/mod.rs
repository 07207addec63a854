mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

/// Longest body excerpt carried in an error, in characters.
const EXCERPT_CHARS: usize = 200;

/// Issues a single GET to `url` and returns the raw body of a 2xx response.
///
/// # Errors
///
/// [`FetchError::Timeout`] when the client's timeout elapses,
/// [`FetchError::HttpStatus`] for non-2xx responses and
/// [`FetchError::Transport`] for everything else on the wire.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Bytes, FetchError> {
    let parsed = url.parse::<reqwest::Url>().map_err(|e| FetchError::Transport {
        detail: format!("invalid upstream URL '{url}': {e}"),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            body_excerpt: excerpt(&body),
        });
    }

    let body = resp.bytes().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "Upstream body received");
    Ok(body)
}

/// Fetches `url` and decodes the body as JSON.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Value, FetchError> {
    let body = fetch_bytes(client, url).await?;
    decode_body(&body)
}

/// Decodes a raw upstream body as JSON.
///
/// # Errors
///
/// Returns [`FetchError::MalformedJson`] with a short excerpt of the body.
pub fn decode_body(body: &[u8]) -> Result<Value, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::MalformedJson {
        detail: e.to_string(),
        raw_body_excerpt: excerpt(&String::from_utf8_lossy(body)),
    })
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
