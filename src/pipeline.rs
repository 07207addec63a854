//! Fetch → unwrap → normalize, shared by the HTTP handler and the CLI.

use anyhow::Context;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use crate::envelope::EnvelopeUnwrapper;
use crate::error::ProcessError;
use crate::fetch::{BasicClient, HttpClient, decode_body, fetch_json};
use crate::normalize::normalize_all;
use crate::record::CanonicalRecord;
use crate::stats::BatchStats;

/// Turns an already-decoded upstream payload into canonical records.
///
/// # Errors
///
/// Only envelope errors abort; bad records are dropped and counted.
pub fn process_payload(
    unwrapper: &EnvelopeUnwrapper,
    payload: Value,
) -> Result<(Vec<CanonicalRecord>, BatchStats), ProcessError> {
    let raw = unwrapper.unwrap(payload)?;
    info!(raw_records = raw.len(), "Upstream records extracted");
    Ok(normalize_all(raw))
}

/// Fetches the upstream feed once and normalizes it.
#[tracing::instrument(skip_all, fields(url = %url))]
pub async fn fetch_and_process<C: HttpClient + ?Sized>(
    client: &C,
    unwrapper: &EnvelopeUnwrapper,
    url: &str,
) -> Result<(Vec<CanonicalRecord>, BatchStats), ProcessError> {
    let payload = fetch_json(client, url).await?;
    process_payload(unwrapper, payload)
}

/// Whether a CLI source names an `http://` or `https://` URL rather than a
/// local path.
pub fn is_url(source: &str) -> bool {
    source.split_once("://").is_some_and(|(scheme, _)| {
        scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
    })
}

/// Loads a feed payload from a local file or fetches it over HTTP.
///
/// Files are decoded exactly like an upstream body.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_source(source: &str, timeout: Duration) -> anyhow::Result<Value> {
    if is_url(source) {
        let client = BasicClient::with_timeout(timeout)?;
        return Ok(fetch_json(&client, source).await?);
    }

    let body = tokio::fs::read(source)
        .await
        .with_context(|| format!("failed to read feed snapshot '{source}'"))?;
    Ok(decode_body(&body)?)
}
