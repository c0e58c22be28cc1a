//! Retrieval orchestration.
//!
//! Composes discovery output into an attributed source list: fetch each
//! discovered location's base text, score its segments, and request
//! commentary connections only for the segments that are actually on topic.
//! An author's commentary on a whole work is never fetched wholesale; the
//! relevant-segment narrowing bounds both cost and result noise.
//!
//! Per-item failures (one bad fetch, one unknown author) are logged and
//! skipped; the rest of the batch proceeds. The final ordering is computed
//! from scores, never from completion order.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::authors;
use crate::config::{FetchConfig, ScoringConfig};
use crate::error::{Error, Result};
use crate::fetch::TextSource;
use crate::models::{
    DiscoveryHit, RetrievalPhase, RetrievalResult, SourceRecord, TopicQuery,
};
use crate::segments::SegmentScorer;

/// One requested commentator; at most one request is marked primary.
#[derive(Debug, Clone)]
pub struct AuthorRequest {
    pub name: String,
    pub primary: bool,
}

impl AuthorRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: false,
        }
    }

    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: true,
        }
    }
}

pub struct RetrievalOrchestrator<'a> {
    source: &'a dyn TextSource,
    scoring: &'a ScoringConfig,
    config: &'a FetchConfig,
}

impl<'a> RetrievalOrchestrator<'a> {
    pub fn new(
        source: &'a dyn TextSource,
        scoring: &'a ScoringConfig,
        config: &'a FetchConfig,
    ) -> Self {
        Self {
            source,
            scoring,
            config,
        }
    }

    /// Assemble the ranked, attributed source list for the discovery hits.
    ///
    /// Fails only when there is nothing to retrieve from; everything past
    /// that point degrades per item.
    pub async fn retrieve(
        &self,
        hits: &[DiscoveryHit],
        requested: &[AuthorRequest],
        query: &TopicQuery,
    ) -> Result<RetrievalResult> {
        if hits.is_empty() {
            return Err(Error::NoEvidenceFound {
                topics: query.topics.clone(),
            });
        }

        let mut phase = RetrievalPhase::Scoring;
        let scorer = SegmentScorer::new(self.scoring);
        let mut sources: Vec<SourceRecord> = Vec::new();
        let mut per_author: HashMap<&str, usize> = HashMap::new();
        let mut locations_fetched = 0usize;
        let mut relevant_total = 0usize;

        for hit in hits.iter().take(self.config.max_locations) {
            let base_ref = hit.target.to_string();
            let fetched = match self.source.fetch_text(&base_ref).await {
                Ok(fetched) => fetched,
                Err(err) => {
                    warn!(%err, reference = %base_ref, "skipping location, base text fetch failed");
                    continue;
                }
            };
            locations_fetched += 1;

            let scored = scorer.score(&fetched.segments, &query.focus, &query.topics);
            let relevant: Vec<_> = scored.iter().filter(|s| s.is_relevant).collect();
            debug!(
                reference = %base_ref,
                segments = scored.len(),
                relevant = relevant.len(),
                "segments scored"
            );
            relevant_total += relevant.len();
            if relevant.is_empty() {
                continue;
            }

            phase = RetrievalPhase::Fetching;
            for request in requested {
                let pattern = match authors::resolve(&request.name, &hit.target) {
                    Ok(pattern) => pattern,
                    Err(err) => {
                        warn!(%err, author = %request.name, "skipping author");
                        continue;
                    }
                };
                let hint = pattern.patterns.first().copied().unwrap_or_default();

                for segment in &relevant {
                    if sources.len() >= self.config.max_total {
                        break;
                    }
                    if per_author.get(pattern.author).copied().unwrap_or(0)
                        >= self.config.max_per_author
                    {
                        break;
                    }

                    let segment_location = hit.target.with_segment(segment.index);
                    let segment_ref = segment_location.to_string();
                    let commentaries = match self
                        .source
                        .related_commentaries(&segment_ref, hint)
                        .await
                    {
                        Ok(commentaries) => commentaries,
                        Err(err) => {
                            warn!(%err, reference = %segment_ref, "commentary fetch failed");
                            continue;
                        }
                    };

                    for commentary in commentaries {
                        if !pattern.accepts(&commentary.reference) {
                            continue;
                        }
                        let count = per_author.entry(pattern.author).or_insert(0);
                        if *count >= self.config.max_per_author
                            || sources.len() >= self.config.max_total
                        {
                            break;
                        }
                        *count += 1;
                        sources.push(SourceRecord {
                            reference: commentary.reference,
                            author: pattern.author.to_string(),
                            location: segment_location.clone(),
                            text: commentary.text,
                            matched_terms: segment.matched_terms.clone(),
                            focus_score: segment.focus_score,
                            is_primary: request.primary,
                        });
                    }
                }
            }
        }

        // Explicit final ordering: the primary author's sources first, then
        // grouped by author, focus score descending within a group.
        sources.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| a.author.cmp(&b.author))
                .then_with(|| {
                    b.focus_score
                        .partial_cmp(&a.focus_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.location.cmp(&b.location))
        });

        if phase != RetrievalPhase::Fetching {
            debug!("no relevant segments anywhere, nothing fetched");
        }
        phase = RetrievalPhase::Assembled;
        info!(
            sources = sources.len(),
            locations = locations_fetched,
            relevant = relevant_total,
            "retrieval assembled"
        );

        Ok(RetrievalResult {
            phase,
            sources,
            locations_fetched,
            relevant_segments: relevant_total,
        })
    }
}
