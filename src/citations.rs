//! Citation extraction from commentary prose.
//!
//! Scans free-form Hebrew commentary text for cross-references to tractate
//! locations ("פסחים ד ע"ב", "ב"ק יז"), resolving work names through an
//! alias table covering both spelled-out names and conventional
//! abbreviations. Confidence is a precision-over-recall ladder: fully
//! spelled names weigh 0.95, abbreviations 0.7, and an explicit folio side
//! adds 0.05 (capped at 1.0). Tokens that fail to resolve are dropped and
//! logged, never guessed, since false citations corrupt downstream ranking.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Citation, CorpusLocation, Side};
use crate::normalize::{normalize, parse_section_number};

struct Alias {
    text: &'static str,
    work: &'static str,
    full: bool,
}

const fn full(text: &'static str, work: &'static str) -> Alias {
    Alias {
        text,
        work,
        full: true,
    }
}

const fn abbrev(text: &'static str, work: &'static str) -> Alias {
    Alias {
        text,
        work,
        full: false,
    }
}

/// Spelled-out tractate names and conventional abbreviations, mapped to
/// canonical work identifiers. Abbreviations are listed in their normalized
/// form (ASCII quote for gershayim, ASCII apostrophe for geresh).
static ALIASES: &[Alias] = &[
    full("ברכות", "Berakhot"),
    full("שבת", "Shabbat"),
    full("עירובין", "Eruvin"),
    full("פסחים", "Pesachim"),
    full("ראש השנה", "Rosh Hashanah"),
    full("יומא", "Yoma"),
    full("סוכה", "Sukkah"),
    full("ביצה", "Beitzah"),
    full("תענית", "Taanit"),
    full("מגילה", "Megillah"),
    full("מועד קטן", "Moed Katan"),
    full("חגיגה", "Chagigah"),
    full("יבמות", "Yevamot"),
    full("כתובות", "Ketubot"),
    full("נדרים", "Nedarim"),
    full("נזיר", "Nazir"),
    full("סוטה", "Sotah"),
    full("גיטין", "Gittin"),
    full("קידושין", "Kiddushin"),
    full("בבא קמא", "Bava Kamma"),
    full("בבא מציעא", "Bava Metzia"),
    full("בבא בתרא", "Bava Batra"),
    full("סנהדרין", "Sanhedrin"),
    full("מכות", "Makkot"),
    full("שבועות", "Shevuot"),
    full("עבודה זרה", "Avodah Zarah"),
    full("זבחים", "Zevachim"),
    full("מנחות", "Menachot"),
    full("חולין", "Chullin"),
    full("נדה", "Niddah"),
    abbrev("ב\"ק", "Bava Kamma"),
    abbrev("ב\"מ", "Bava Metzia"),
    abbrev("ב\"ב", "Bava Batra"),
    abbrev("ע\"ז", "Avodah Zarah"),
    abbrev("ר\"ה", "Rosh Hashanah"),
    abbrev("מו\"ק", "Moed Katan"),
    abbrev("פסח'", "Pesachim"),
    abbrev("ברכ'", "Berakhot"),
    abbrev("כתוב'", "Ketubot"),
    abbrev("קידוש'", "Kiddushin"),
    abbrev("סנהד'", "Sanhedrin"),
    abbrev("גיט'", "Gittin"),
    abbrev("מגיל'", "Megillah"),
    abbrev("חול'", "Chullin"),
];

static ALIAS_LOOKUP: Lazy<HashMap<&'static str, &'static Alias>> =
    Lazy::new(|| ALIASES.iter().map(|a| (a.text, a)).collect());

/// One pattern covers every alias: optional tractate marker, the work name,
/// optional daf marker, a number in Arabic or letter-numeral form, optional
/// folio-side marker. Longer aliases are listed first so "בבא קמא" wins
/// over any prefix of it.
static CITE_RE: Lazy<Regex> = Lazy::new(|| {
    let mut names: Vec<&str> = ALIASES.iter().map(|a| a.text).collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
    let alternation = names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    // Word boundaries keep short names from matching inside longer words:
    // prefixed forms (בפסחים, ובפסחים) are matched via the explicit prefix
    // letters, while השבת is not a citation. The trailing boundary keeps the
    // numeral token from eating the head of an ordinary word.
    let pattern = format!(
        "\\b(?:ב?מסכת )?ו?[בדל]?({alternation}) (?:דף )?(\\d{{1,3}}|[א-ת]{{1,2}}\"?[א-ת]?)\\b( ?ע\"[אב]|[.:])?"
    );
    Regex::new(&pattern).unwrap()
});

/// Stateless extractor; all knowledge lives in the static tables above.
#[derive(Debug, Default)]
pub struct CitationExtractor;

impl CitationExtractor {
    pub fn new() -> Self {
        CitationExtractor
    }

    /// Extract every resolvable citation from `text`. Input is normalized
    /// first; duplicate (work, daf, side) matches are emitted once with the
    /// highest weight seen.
    pub fn extract(&self, text: &str, source: &CorpusLocation) -> Vec<Citation> {
        let text = normalize(text);
        let mut seen: HashSet<CorpusLocation> = HashSet::new();
        let mut citations = Vec::new();

        for caps in CITE_RE.captures_iter(&text) {
            let matched = caps[0].trim().to_string();
            let alias = &caps[1];
            let number = &caps[2];
            let side_mark = caps.get(3).map(|m| m.as_str().trim());

            match resolve_target(alias, number, side_mark) {
                Ok((target, weight)) => {
                    if !seen.insert(target.clone()) {
                        continue;
                    }
                    citations.push(Citation {
                        source: source.clone(),
                        target,
                        weight,
                        matched,
                    });
                }
                Err(err) => {
                    debug!(%err, matched = %matched, "dropping unresolvable citation");
                }
            }
        }
        citations
    }
}

/// Map a matched alias + number token to a canonical location and weight.
fn resolve_target(
    alias: &str,
    number: &str,
    side_mark: Option<&str>,
) -> Result<(CorpusLocation, f64)> {
    let info = ALIAS_LOOKUP
        .get(alias)
        .ok_or_else(|| Error::UnresolvableCitation {
            matched: alias.to_string(),
        })?;

    let section = parse_section_number(number).ok_or_else(|| Error::UnresolvableCitation {
        matched: format!("{alias} {number}"),
    })?;
    // Daf numbers outside the range of any tractate are noise, not citations.
    if !(2..=180).contains(&section) {
        return Err(Error::UnresolvableCitation {
            matched: format!("{alias} {number}"),
        });
    }

    let (side, explicit) = match side_mark {
        Some(mark) if mark.contains('ב') || mark == ":" => (Side::B, true),
        Some(_) => (Side::A, true),
        // A bare daf reference conventionally means the first side.
        None => (Side::A, false),
    };

    let mut weight: f64 = if info.full { 0.95 } else { 0.7 };
    if explicit {
        weight = (weight + 0.05).min(1.0);
    }

    Ok((CorpusLocation::new(info.work, section, Some(side)), weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> CorpusLocation {
        CorpusLocation::new("Shulchan Arukh, Orach Chayim", 431, None)
    }

    #[test]
    fn spelled_name_with_explicit_side_weighs_full() {
        let extractor = CitationExtractor::new();
        let cites = extractor.extract("ועיין פסחים ד ע\"ב שם", &source());
        assert_eq!(cites.len(), 1);
        let cite = &cites[0];
        assert_eq!(cite.target, CorpusLocation::new("Pesachim", 4, Some(Side::B)));
        assert!((cite.weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spelled_name_without_side_defaults_to_a() {
        let extractor = CitationExtractor::new();
        let cites = extractor.extract("כדאיתא בבא קמא יז", &source());
        assert_eq!(cites.len(), 1);
        assert_eq!(
            cites[0].target,
            CorpusLocation::new("Bava Kamma", 17, Some(Side::A))
        );
        assert!((cites[0].weight - 0.95).abs() < 1e-9);
    }

    #[test]
    fn abbreviation_weighs_lower_than_spelled_name() {
        let extractor = CitationExtractor::new();
        let cites = extractor.extract("ועיין ב\"ק יז", &source());
        assert_eq!(cites.len(), 1);
        assert!((cites[0].weight - 0.7).abs() < 1e-9);
    }

    #[test]
    fn arabic_numerals_and_daf_marker_accepted() {
        let extractor = CitationExtractor::new();
        let cites = extractor.extract("עיין מסכת שבת דף 21:", &source());
        assert_eq!(cites.len(), 1);
        assert_eq!(
            cites[0].target,
            CorpusLocation::new("Shabbat", 21, Some(Side::B))
        );
    }

    #[test]
    fn duplicate_targets_emitted_once() {
        let extractor = CitationExtractor::new();
        let text = "פסחים ד ע\"ב ועוד שם פסחים ד ע\"ב";
        let cites = extractor.extract(text, &source());
        assert_eq!(cites.len(), 1);
    }

    #[test]
    fn out_of_range_daf_is_dropped() {
        let extractor = CitationExtractor::new();
        let cites = extractor.extract("פסחים תק", &source());
        assert!(cites.is_empty());
    }

    #[test]
    fn unknown_work_names_never_match() {
        let extractor = CitationExtractor::new();
        let cites = extractor.extract("ספר הזכרונות ד ע\"א", &source());
        assert!(cites.is_empty());
    }

    #[test]
    fn markup_and_points_are_normalized_before_matching() {
        let extractor = CitationExtractor::new();
        let cites = extractor.extract("<b>פסחים</b> ד ע\u{05F4}ב", &source());
        assert_eq!(cites.len(), 1);
        assert_eq!(cites[0].target.work, "Pesachim");
    }
}
