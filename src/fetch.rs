//! Text-retrieval boundary.
//!
//! The remote library service supplies literal text for a reference and the
//! commentary links attached to it. The core treats it as slow and fallible:
//! calls time out, transient failures are retried with exponential backoff,
//! and a single failed reference never aborts a batch (the orchestrator
//! isolates it).
//!
//! [`TextSource`] is the seam: production uses [`HttpTextSource`], tests
//! substitute an in-memory implementation.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{Error, Result};

/// Segmented text returned for one reference.
#[derive(Debug, Clone)]
pub struct FetchedText {
    pub reference: String,
    pub segments: Vec<String>,
}

/// One commentary connection attached to a reference.
#[derive(Debug, Clone)]
pub struct RelatedCommentary {
    /// The commentary's own reference (e.g. `"Rashi on Pesachim 4b:2"`).
    pub reference: String,
    pub text: String,
}

/// External text-retrieval collaborator.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Fetch the segmented text of a reference.
    async fn fetch_text(&self, reference: &str) -> Result<FetchedText>;

    /// Fetch the commentary connections of a reference. Implementations may
    /// pre-filter by `author_hint`; callers still apply their own
    /// pattern/exclusion filter to whatever comes back.
    async fn related_commentaries(
        &self,
        reference: &str,
        author_hint: &str,
    ) -> Result<Vec<RelatedCommentary>>;
}

/// [`TextSource`] backed by the remote library HTTP API.
pub struct HttpTextSource {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpTextSource {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::fetch("<client>", e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    /// GET a JSON endpoint with retry/backoff. 429 and 5xx retry; other
    /// client errors fail immediately.
    async fn get_json(&self, reference: &str, url: &str) -> Result<serde_json::Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.get(url).send().await;
            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .map_err(|e| Error::fetch(reference, e.to_string()));
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        debug!(%reference, %status, attempt, "transient fetch failure");
                        last_err = Some(Error::fetch(reference, format!("HTTP {status}")));
                        continue;
                    }
                    return Err(Error::fetch(reference, format!("HTTP {status}")));
                }
                Err(e) => {
                    last_err = Some(Error::fetch(reference, e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::fetch(reference, "fetch failed after retries")))
    }
}

#[async_trait]
impl TextSource for HttpTextSource {
    async fn fetch_text(&self, reference: &str) -> Result<FetchedText> {
        let url = format!(
            "{}/texts/{}?context=0&commentary=0",
            self.base_url,
            encode_ref(reference)
        );
        let json = self.get_json(reference, &url).await?;
        let segments = extract_segments(&json);
        if segments.is_empty() {
            return Err(Error::fetch(reference, "no text in response"));
        }
        Ok(FetchedText {
            reference: reference.to_string(),
            segments,
        })
    }

    async fn related_commentaries(
        &self,
        reference: &str,
        author_hint: &str,
    ) -> Result<Vec<RelatedCommentary>> {
        let url = format!("{}/links/{}", self.base_url, encode_ref(reference));
        let json = self.get_json(reference, &url).await?;
        let links = json.as_array().cloned().unwrap_or_default();

        let hint = author_hint.to_lowercase();
        let mut out = Vec::new();
        for link in links {
            let link_ref = link
                .get("ref")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string();
            if link_ref.is_empty() {
                continue;
            }
            if !hint.is_empty() && !link_ref.to_lowercase().contains(&hint) {
                continue;
            }
            let text = link
                .get("he")
                .map(flatten_text)
                .unwrap_or_default();
            out.push(RelatedCommentary {
                reference: link_ref,
                text,
            });
        }
        Ok(out)
    }
}

/// The library API addresses references with underscores for spaces.
fn encode_ref(reference: &str) -> String {
    reference.replace(' ', "_")
}

/// Pull the Hebrew segment list out of a texts response. The `he` field is
/// either a string or a (possibly nested) array of strings.
fn extract_segments(json: &serde_json::Value) -> Vec<String> {
    match json.get("he") {
        Some(value) => collect_strings(value),
        None => Vec::new(),
    }
}

fn collect_strings(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        serde_json::Value::Array(items) => items.iter().flat_map(collect_strings).collect(),
        _ => Vec::new(),
    }
}

fn flatten_text(value: &serde_json::Value) -> String {
    collect_strings(value).join(" ")
}
