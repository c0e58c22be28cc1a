//! Per-segment relevance scoring.
//!
//! Scores each atomic segment of a section against variant-expanded topic
//! and focus terms, so morphological variation (construct forms, a leading
//! determiner, compound spacing) does not hide real matches. Scoring is a
//! pure function of the inputs; calling it twice yields identical results.

use crate::config::ScoringConfig;
use crate::models::Segment;
use crate::normalize::{contains_word, expand_variants, normalize, TermVariant};

pub struct SegmentScorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> SegmentScorer<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Score every segment. `combined = focus * focus_weight + topic`;
    /// a segment is relevant iff combined reaches the configured threshold.
    pub fn score(&self, segments: &[String], focus: &[String], topics: &[String]) -> Vec<Segment> {
        segments
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let normalized = normalize(text);
                let (focus_score, mut matched) = self.term_set_score(&normalized, focus);
                let (topic_score, topic_matched) = self.term_set_score(&normalized, topics);
                for term in topic_matched {
                    if !matched.contains(&term) {
                        matched.push(term);
                    }
                }
                let combined = focus_score * self.config.focus_weight + topic_score;
                Segment {
                    index,
                    text: text.clone(),
                    focus_score,
                    topic_score,
                    combined_score: combined,
                    is_relevant: combined >= self.config.relevance_threshold,
                    matched_terms: matched,
                }
            })
            .collect()
    }

    fn term_set_score(&self, text: &str, terms: &[String]) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut matched = Vec::new();
        for term in terms {
            for variant in expand_variants(term) {
                if contains_word(text, &variant.text) {
                    score += self.variant_points(&variant);
                    matched.push(variant.text);
                }
            }
        }
        (score, matched)
    }

    /// Multi-word phrases and bound-construct forms are as distinguishing as
    /// each other; generic low-information words barely count.
    fn variant_points(&self, variant: &TermVariant) -> f64 {
        if variant.text.contains(' ') || variant.construct {
            self.config.phrase_points
        } else if self
            .config
            .generic_terms
            .iter()
            .any(|g| g == &variant.text)
        {
            self.config.generic_points
        } else {
            self.config.word_points
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;

    fn segments(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn scoring_is_idempotent() {
        let config = ScoringConfig::default();
        let scorer = SegmentScorer::new(&config);
        let segs = segments(&["אור לארבעה עשר בודקין את החמץ", "ביטול חמץ בלב"]);
        let topics = vec!["ביטול חמץ".to_string()];
        let first = scorer.score(&segs, &[], &topics);
        let second = scorer.score(&segs, &[], &topics);
        assert_eq!(first, second);
    }

    #[test]
    fn verbatim_phrase_outscores_generic_word() {
        let mut config = ScoringConfig::default();
        config.generic_terms = vec!["דין".to_string()];
        let scorer = SegmentScorer::new(&config);
        let segs = segments(&["כאן ביטול חמץ מפורש", "וכאן רק דין אחר נזכר"]);
        let topics = vec!["ביטול חמץ".to_string(), "דין".to_string()];
        let scored = scorer.score(&segs, &[], &topics);
        assert!(scored[0].combined_score >= scored[1].combined_score);
        assert!(scored[0].is_relevant);
        assert!(!scored[1].is_relevant);
    }

    #[test]
    fn focus_matches_weigh_double() {
        let config = ScoringConfig::default();
        let scorer = SegmentScorer::new(&config);
        let segs = segments(&["בדיקת חמץ בלילה"]);
        let focus = vec!["בדיקת חמץ".to_string()];
        let scored = scorer.score(&segs, &focus, &[]);
        assert!((scored[0].focus_score - config.phrase_points).abs() < 1e-9);
        assert!(
            (scored[0].combined_score - config.phrase_points * config.focus_weight).abs() < 1e-9
        );
    }

    #[test]
    fn construct_form_counts_as_phrase() {
        let config = ScoringConfig::default();
        let scorer = SegmentScorer::new(&config);
        let segs = segments(&["בדיקת הבית"]);
        let topics = vec!["בדיקה".to_string()];
        let scored = scorer.score(&segs, &[], &topics);
        assert!((scored[0].topic_score - config.phrase_points).abs() < 1e-9);
        assert!(scored[0].matched_terms.contains(&"בדיקת".to_string()));
    }

    #[test]
    fn off_topic_segments_are_not_relevant() {
        let config = ScoringConfig::default();
        let scorer = SegmentScorer::new(&config);
        let segs = segments(&["הלכות שבת ומועד"]);
        let topics = vec!["ביטול חמץ".to_string()];
        let scored = scorer.score(&segs, &[], &topics);
        assert!(!scored[0].is_relevant);
        assert_eq!(scored[0].combined_score, 0.0);
    }
}
