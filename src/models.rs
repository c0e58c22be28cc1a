//! Core data models used throughout Mekorot.
//!
//! These types represent the locations, citations, discovery hits, and
//! attributed sources that flow through the discovery and retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Folio side (amud) within a daf-addressed work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "a"),
            Side::B => write!(f, "b"),
        }
    }
}

/// Immutable structural coordinate within a named base work.
///
/// Equality is field-wise over the already-normalized forms; locations are
/// ordered within a work by subdivision, not globally across works.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorpusLocation {
    /// Canonical work identifier (e.g. `"Pesachim"`, `"Shulchan Arukh, Orach Chayim"`).
    pub work: String,
    /// Primary subdivision: daf number or siman number.
    pub section: u32,
    /// Secondary subdivision for folio-addressed works.
    pub side: Option<Side>,
    /// Atomic segment index within the section, when resolved.
    pub segment: Option<usize>,
}

impl CorpusLocation {
    pub fn new(work: impl Into<String>, section: u32, side: Option<Side>) -> Self {
        Self {
            work: work.into(),
            section,
            side,
            segment: None,
        }
    }

    pub fn with_segment(&self, segment: usize) -> Self {
        Self {
            segment: Some(segment),
            ..self.clone()
        }
    }

    /// The location with any segment index dropped, for use as an
    /// aggregation key during discovery.
    pub fn section_key(&self) -> Self {
        Self {
            segment: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for CorpusLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.work, self.section)?;
        if let Some(side) = self.side {
            write!(f, "{side}")?;
        }
        if let Some(segment) = self.segment {
            write!(f, ":{}", segment + 1)?;
        }
        Ok(())
    }
}

/// A leaf unit of the base corpus: one location, its segmented text, and the
/// commentary layers attached to it. Built once at index load, read-only after.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub location: CorpusLocation,
    /// The section's text in its natural atomic units.
    pub segments: Vec<String>,
    /// Commentary layer name -> that layer's text for this section.
    pub layers: BTreeMap<String, String>,
}

impl CorpusEntry {
    /// Full section text, used for phrase search.
    pub fn text(&self) -> String {
        self.segments.join(" ")
    }
}

/// A structured cross-reference extracted from commentary prose.
///
/// Ephemeral: produced per extraction call, never persisted.
#[derive(Debug, Clone)]
pub struct Citation {
    /// Where the citing text lives.
    pub source: CorpusLocation,
    /// What it points at (work + subdivision, segment unresolved).
    pub target: CorpusLocation,
    /// Confidence weight in (0, 1].
    pub weight: f64,
    /// The literal text that matched.
    pub matched: String,
}

/// Topic and focus terms for one discovery call. Both are ordered lists of
/// phrases, not bags of words.
#[derive(Debug, Clone, Default)]
pub struct TopicQuery {
    pub topics: Vec<String>,
    pub focus: Vec<String>,
}

impl TopicQuery {
    pub fn new(topics: Vec<String>) -> Self {
        Self {
            topics,
            focus: Vec::new(),
        }
    }

    pub fn with_focus(mut self, focus: Vec<String>) -> Self {
        self.focus = focus;
        self
    }
}

/// How a multi-topic discovery result was merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    SingleTopic,
    Intersection,
    UnionFallback,
}

/// One ranked discovery target with its evidence breakdown.
#[derive(Debug, Clone)]
pub struct DiscoveryHit {
    pub target: CorpusLocation,
    /// Weighted sum of citation weights, scaled per evidence layer.
    pub score: f64,
    /// Evidence layer name -> contribution, for explainability.
    pub layer_breakdown: BTreeMap<String, f64>,
    /// How many distinct topic terms surfaced this target.
    pub topic_count: usize,
}

/// The Discoverer's externally visible result.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    pub hits: Vec<DiscoveryHit>,
    pub mode: MergeMode,
    /// Set when no citation evidence was found after both the combined-phrase
    /// and per-term fallback passes. An empty result is legitimate output.
    pub low_confidence: bool,
}

/// A contiguous span of a section's text with its relevance scores.
/// Recomputed per request, never mutated after scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub text: String,
    pub focus_score: f64,
    pub topic_score: f64,
    pub combined_score: f64,
    pub is_relevant: bool,
    /// The term variants that matched, for provenance.
    pub matched_terms: Vec<String>,
}

/// A final attributed source handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Fully constructed reference string (e.g. `"Ran on Rif Pesachim 4b"`).
    pub reference: String,
    pub author: String,
    pub location: CorpusLocation,
    pub text: String,
    pub matched_terms: Vec<String>,
    pub focus_score: f64,
    pub is_primary: bool,
}

/// Phases of one discovery-and-retrieval call.
///
/// `Assembled` is a success even with zero sources; `Failed` means the corpus
/// was unavailable and no fallback path succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalPhase {
    Pending,
    Locating,
    Scoring,
    Fetching,
    Assembled,
    Failed,
}

impl fmt::Display for RetrievalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RetrievalPhase::Pending => "pending",
            RetrievalPhase::Locating => "locating",
            RetrievalPhase::Scoring => "scoring",
            RetrievalPhase::Fetching => "fetching",
            RetrievalPhase::Assembled => "assembled",
            RetrievalPhase::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// The orchestrator's result: the ranked source list plus the terminal phase.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub phase: RetrievalPhase,
    pub sources: Vec<SourceRecord>,
    /// Locations actually fetched (after relevance narrowing).
    pub locations_fetched: usize,
    /// Relevant segments found across all fetched locations.
    pub relevant_segments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_renders_folio_side() {
        let loc = CorpusLocation::new("Pesachim", 4, Some(Side::B));
        assert_eq!(loc.to_string(), "Pesachim 4b");
    }

    #[test]
    fn location_display_without_side() {
        let loc = CorpusLocation::new("Shulchan Arukh, Orach Chayim", 431, None);
        assert_eq!(loc.to_string(), "Shulchan Arukh, Orach Chayim 431");
    }

    #[test]
    fn location_display_with_segment_is_one_based() {
        let loc = CorpusLocation::new("Pesachim", 4, Some(Side::B)).with_segment(0);
        assert_eq!(loc.to_string(), "Pesachim 4b:1");
    }

    #[test]
    fn section_key_drops_segment() {
        let loc = CorpusLocation::new("Pesachim", 4, Some(Side::A)).with_segment(3);
        assert_eq!(loc.section_key().segment, None);
        assert_eq!(loc.section_key().work, "Pesachim");
    }

    #[test]
    fn locations_order_by_subdivision_within_a_work() {
        let early = CorpusLocation::new("Pesachim", 4, Some(Side::A));
        let late = CorpusLocation::new("Pesachim", 6, Some(Side::B));
        assert!(early < late);
    }
}
