//! Citation-graph discovery.
//!
//! Later authorities act as semantic indices for the foundational text:
//! searching the codified layers for the topic, then following the citations
//! their commentaries make, surfaces the Talmudic locations where the topic
//! actually lives ("trickle-down"). Evidence from each layer is scaled by a
//! per-layer trust weight and summed per target location, an order-
//! independent reduction, so the final ranking depends only on the evidence
//! itself.
//!
//! Multi-topic queries use an intersection-first policy: a location cited
//! under every topic term is preferred outright; when no such location
//! exists, the union of per-topic results is used with a bonus multiplier
//! for locations appearing under more than one topic, so true convergence
//! still outranks single-topic coincidence.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::citations::CitationExtractor;
use crate::config::DiscoveryConfig;
use crate::corpus::CorpusIndex;
use crate::models::{CorpusLocation, DiscoveryHit, DiscoveryResult, MergeMode, TopicQuery};

/// Aggregated citation weight for one target, with its per-layer breakdown.
#[derive(Debug, Clone, Default)]
struct Evidence {
    score: f64,
    breakdown: BTreeMap<String, f64>,
}

impl Evidence {
    fn add(&mut self, layer: &str, weight: f64) {
        self.score += weight;
        *self.breakdown.entry(layer.to_string()).or_insert(0.0) += weight;
    }

    fn merge(&mut self, other: &Evidence) {
        self.score += other.score;
        for (layer, weight) in &other.breakdown {
            *self.breakdown.entry(layer.clone()).or_insert(0.0) += weight;
        }
    }

    fn scale(&mut self, factor: f64) {
        self.score *= factor;
        for weight in self.breakdown.values_mut() {
            *weight *= factor;
        }
    }
}

pub struct Discoverer<'a> {
    index: &'a CorpusIndex,
    config: &'a DiscoveryConfig,
    extractor: CitationExtractor,
}

impl<'a> Discoverer<'a> {
    pub fn new(index: &'a CorpusIndex, config: &'a DiscoveryConfig) -> Self {
        Self {
            index,
            config,
            extractor: CitationExtractor::new(),
        }
    }

    /// Rank target locations by aggregated citation evidence for the query.
    /// `candidate_works` optionally restricts targets to the named works.
    /// Zero evidence is a legitimate empty result flagged low-confidence,
    /// never an error.
    pub fn discover(&self, query: &TopicQuery, candidate_works: &[String]) -> DiscoveryResult {
        if query.topics.is_empty() {
            return DiscoveryResult {
                hits: Vec::new(),
                mode: MergeMode::SingleTopic,
                low_confidence: true,
            };
        }

        // Long conjunctive phrases systematically fail free-text search, so
        // the fallback pass retries with just the first two topic terms.
        let fallback: Vec<String> = query.topics.iter().take(2).cloned().collect();

        let per_topic: Vec<HashMap<CorpusLocation, Evidence>> = query
            .topics
            .iter()
            .map(|topic| self.gather(std::slice::from_ref(topic), &fallback))
            .collect();

        let (merged, mode) = merge_topic_evidence(per_topic, self.config.multi_topic_bonus);

        let mut hits: Vec<DiscoveryHit> = merged
            .into_iter()
            .filter(|(target, _)| {
                candidate_works.is_empty() || candidate_works.contains(&target.work)
            })
            .map(|(target, (evidence, topic_count))| DiscoveryHit {
                target,
                score: evidence.score,
                layer_breakdown: evidence.breakdown,
                topic_count,
            })
            .collect();

        // Deterministic: score descending, then subdivision order.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.target.cmp(&b.target))
        });
        hits.truncate(self.config.top_k);

        let low_confidence = hits.is_empty();
        if low_confidence {
            info!(topics = ?query.topics, "no citation evidence found");
        } else {
            info!(
                hits = hits.len(),
                mode = ?mode,
                top = %hits[0].target,
                "discovery complete"
            );
        }
        DiscoveryResult {
            hits,
            mode,
            low_confidence,
        }
    }

    /// Search every evidence layer for the phrases and aggregate the
    /// citations made by the commentaries of each matching section. When a
    /// phrase finds nothing and exceeds the word-count cutoff, retry with
    /// the fallback terms; joining many long phrases silently destroys
    /// recall, so the fix is input shaping, not a looser matcher.
    fn gather(&self, phrases: &[String], fallback: &[String]) -> HashMap<CorpusLocation, Evidence> {
        let mut evidence: HashMap<CorpusLocation, Evidence> = HashMap::new();
        let phrase_words: usize = phrases.iter().map(|p| p.split_whitespace().count()).sum();

        for layer in &self.config.layers {
            let mut entries = self.index.search_text(&layer.work, phrases);
            if entries.is_empty()
                && phrase_words > self.config.combined_phrase_max_words
                && !fallback.is_empty()
            {
                debug!(
                    layer = %layer.name,
                    words = phrase_words,
                    "combined phrase too long, retrying with leading terms"
                );
                entries = self.index.search_text(&layer.work, fallback);
            }

            for entry in entries.into_iter().take(self.config.per_layer_cap) {
                for text in self.index.commentary_layers(entry).values() {
                    for citation in self.extractor.extract(text, &entry.location) {
                        evidence
                            .entry(citation.target.section_key())
                            .or_default()
                            .add(&layer.name, citation.weight * layer.weight);
                    }
                }
            }
        }
        evidence
    }
}

/// The multi-topic merge policy, kept separate from the aggregation
/// internals so the rule can change without touching them.
///
/// Intersection first: locations cited under every topic term, with scores
/// summed across topics. When the intersection is empty, fall back to the
/// union, multiplying any location present under two or more topics by
/// `bonus` so genuine overlaps outrank single-topic noise.
fn merge_topic_evidence(
    per_topic: Vec<HashMap<CorpusLocation, Evidence>>,
    bonus: f64,
) -> (HashMap<CorpusLocation, (Evidence, usize)>, MergeMode) {
    let topic_count = per_topic.len();
    let mut merged: HashMap<CorpusLocation, (Evidence, usize)> = HashMap::new();
    for map in &per_topic {
        for (target, evidence) in map {
            let slot = merged
                .entry(target.clone())
                .or_insert_with(|| (Evidence::default(), 0));
            slot.0.merge(evidence);
            slot.1 += 1;
        }
    }

    if topic_count <= 1 {
        return (merged, MergeMode::SingleTopic);
    }

    let intersection: HashMap<CorpusLocation, (Evidence, usize)> = merged
        .iter()
        .filter(|(_, (_, count))| *count == topic_count)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !intersection.is_empty() {
        return (intersection, MergeMode::Intersection);
    }

    for (evidence, count) in merged.values_mut() {
        if *count >= 2 {
            evidence.scale(bonus);
        }
    }
    (merged, MergeMode::UnionFallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::corpus::CorpusIndex;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_work(root: &Path, name: &str, sections: &[&str]) {
        let dir = root.join(name).join("Hebrew");
        fs::create_dir_all(&dir).unwrap();
        let text: Vec<Vec<&str>> = sections.iter().map(|s| vec![*s]).collect();
        let body = serde_json::json!({ "title": name, "scheme": "siman", "text": text });
        fs::write(dir.join("merged.json"), body.to_string()).unwrap();
    }

    fn write_layer(root: &Path, work: &str, author: &str, sections: &[&str]) {
        let dir = root.join(work).join("Commentary").join(author).join("Hebrew");
        fs::create_dir_all(&dir).unwrap();
        let text: Vec<Vec<&str>> = sections.iter().map(|s| vec![*s]).collect();
        let body = serde_json::json!({ "title": author, "text": text });
        fs::write(dir.join("merged.json"), body.to_string()).unwrap();
    }

    fn single_layer_config() -> DiscoveryConfig {
        DiscoveryConfig {
            layers: vec![LayerConfig {
                name: "codified".to_string(),
                work: "Orach Chayim".to_string(),
                weight: 1.0,
            }],
            ..DiscoveryConfig::default()
        }
    }

    fn query(topics: &[&str]) -> TopicQuery {
        TopicQuery::new(topics.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn more_citations_rank_higher() {
        let tmp = TempDir::new().unwrap();
        write_work(
            tmp.path(),
            "Orach Chayim",
            &["דין ביטול חמץ", "עוד בענין ביטול חמץ", "הלכות שבת"],
        );
        write_layer(
            tmp.path(),
            "Orach Chayim",
            "Gloss",
            &[
                "עיין פסחים ד ע\"ב ועיין פסחים ו ע\"ב",
                "כמבואר בפסחים ד ע\"ב",
                "",
            ],
        );
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let config = single_layer_config();
        let result = Discoverer::new(&index, &config).discover(&query(&["ביטול חמץ"]), &[]);

        assert_eq!(result.mode, MergeMode::SingleTopic);
        assert!(!result.low_confidence);
        assert_eq!(result.hits[0].target, CorpusLocation::new("Pesachim", 4, Some(crate::models::Side::B)));
        assert_eq!(result.hits[1].target, CorpusLocation::new("Pesachim", 6, Some(crate::models::Side::B)));
        assert!(result.hits[0].score > result.hits[1].score);
    }

    #[test]
    fn intersection_preferred_for_multi_topic() {
        let tmp = TempDir::new().unwrap();
        write_work(
            tmp.path(),
            "Orach Chayim",
            &["דין ביטול חמץ", "דין בדיקת חמץ", "עוד מדיני בדיקת חמץ"],
        );
        write_layer(
            tmp.path(),
            "Orach Chayim",
            "Gloss",
            &[
                "עיין פסחים ד ע\"ב",
                "עיין פסחים ד ע\"ב ופסחים ו ע\"ב",
                "עיין פסחים י ע\"א",
            ],
        );
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let config = single_layer_config();
        let result = Discoverer::new(&index, &config)
            .discover(&query(&["ביטול חמץ", "בדיקת חמץ"]), &[]);

        assert_eq!(result.mode, MergeMode::Intersection);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].target.section, 4);
        assert_eq!(result.hits[0].topic_count, 2);
    }

    #[test]
    fn union_fallback_bonuses_overlap() {
        let tmp = TempDir::new().unwrap();
        write_work(
            tmp.path(),
            "Orach Chayim",
            &["דין ביטול חמץ", "דין בדיקת חמץ", "דין מכירת חמץ"],
        );
        // No location is cited under all three topics; daf 6b appears under
        // two of them, daf 10a under one.
        write_layer(
            tmp.path(),
            "Orach Chayim",
            "Gloss",
            &[
                "עיין פסחים ו ע\"ב",
                "עיין פסחים ו ע\"ב",
                "עיין פסחים י ע\"א",
            ],
        );
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let config = single_layer_config();
        let result = Discoverer::new(&index, &config)
            .discover(&query(&["ביטול חמץ", "בדיקת חמץ", "מכירת חמץ"]), &[]);

        assert_eq!(result.mode, MergeMode::UnionFallback);
        assert_eq!(result.hits[0].target.section, 6);
        assert_eq!(result.hits[0].topic_count, 2);
        assert_eq!(result.hits[1].target.section, 10);
        // Equal raw weights: the overlap must win through the bonus alone.
        assert!(result.hits[0].score > result.hits[1].score * 2.0);
    }

    #[test]
    fn long_phrase_falls_back_to_leading_terms() {
        let tmp = TempDir::new().unwrap();
        write_work(tmp.path(), "Orach Chayim", &["דין ביטול חמץ בלב"]);
        write_layer(tmp.path(), "Orach Chayim", "Gloss", &["עיין פסחים ד ע\"ב"]);
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let config = single_layer_config();
        let long_topic = "ביטול חמץ שנעשה קודם זמן איסורו מן התורה";
        let result = Discoverer::new(&index, &config)
            .discover(&query(&[long_topic, "ביטול חמץ"]), &[]);

        assert!(!result.low_confidence);
        assert_eq!(result.hits[0].target.work, "Pesachim");
    }

    #[test]
    fn zero_evidence_is_empty_and_low_confidence() {
        let tmp = TempDir::new().unwrap();
        write_work(tmp.path(), "Orach Chayim", &["הלכות ציצית"]);
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let config = single_layer_config();
        let result = Discoverer::new(&index, &config).discover(&query(&["ביטול חמץ"]), &[]);
        assert!(result.hits.is_empty());
        assert!(result.low_confidence);
    }

    #[test]
    fn candidate_works_restrict_targets() {
        let tmp = TempDir::new().unwrap();
        write_work(tmp.path(), "Orach Chayim", &["דין ביטול חמץ"]);
        write_layer(
            tmp.path(),
            "Orach Chayim",
            "Gloss",
            &["עיין פסחים ד ע\"ב ועיין שבת כא ע\"א"],
        );
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let config = single_layer_config();
        let result = Discoverer::new(&index, &config)
            .discover(&query(&["ביטול חמץ"]), &["Pesachim".to_string()]);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].target.work, "Pesachim");
    }
}
