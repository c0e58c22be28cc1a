//! Commentator reference resolution.
//!
//! A static knowledge table maps each supported commentator to the base-work
//! form they actually write on, the reference patterns that name their
//! commentary, and exclusion patterns for same-named unrelated works. The
//! table is data, not control flow: retrieval code never string-matches
//! author names inline.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::CorpusLocation;

/// The base-work form a commentator writes on. This changes both the
/// reference string and the subdivision numbering convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritesOn {
    /// Directly on the Talmud text.
    Talmud,
    /// On the Rif's halachic digest, an intermediate work with its own
    /// folio numbering.
    RifDigest,
    /// The digest itself.
    IsRifDigest,
    /// On the codified law (Shulchan Arukh).
    CodifiedLaw,
}

/// One commentator's entry in the knowledge table.
#[derive(Debug)]
pub struct AuthorMapping {
    pub canonical: &'static str,
    /// Accepted spellings, matched case-insensitively.
    pub aliases: &'static [&'static str],
    /// Patterns naming this author's commentary, in priority order.
    pub patterns: &'static [&'static str],
    pub writes_on: WritesOn,
    /// Same-named works that must never be returned for this author.
    pub exclusions: &'static [&'static str],
}

static AUTHORS: &[AuthorMapping] = &[
    AuthorMapping {
        canonical: "Rashi",
        aliases: &["rashi", "רש\"י"],
        patterns: &["Rashi on"],
        writes_on: WritesOn::Talmud,
        exclusions: &["Rashi on Genesis", "Rashi on Exodus", "Rashi on Leviticus",
            "Rashi on Numbers", "Rashi on Deuteronomy"],
    },
    AuthorMapping {
        canonical: "Tosafot",
        aliases: &["tosafot", "tosfos", "תוספות"],
        patterns: &["Tosafot on"],
        writes_on: WritesOn::Talmud,
        exclusions: &["Tosafot Yom Tov on", "Tosafot Rid on"],
    },
    AuthorMapping {
        canonical: "Ramban",
        aliases: &["ramban", "רמב\"ן"],
        patterns: &["Chiddushei Ramban on"],
        writes_on: WritesOn::Talmud,
        exclusions: &["Ramban on Genesis", "Ramban on Exodus", "Ramban on Leviticus",
            "Ramban on Numbers", "Ramban on Deuteronomy"],
    },
    AuthorMapping {
        canonical: "Rashba",
        aliases: &["rashba", "רשב\"א"],
        patterns: &["Chidushei Harashba on", "Rashba on"],
        writes_on: WritesOn::Talmud,
        exclusions: &["Teshuvot Harashba"],
    },
    AuthorMapping {
        canonical: "Ritva",
        aliases: &["ritva", "ריטב\"א"],
        patterns: &["Chidushei HaRitva on", "Ritva on"],
        writes_on: WritesOn::Talmud,
        exclusions: &[],
    },
    AuthorMapping {
        canonical: "Maharsha",
        aliases: &["maharsha", "מהרש\"א"],
        patterns: &["Chidushei Halachot on"],
        writes_on: WritesOn::Talmud,
        // Same author, different work: the aggadic collection must not be
        // returned when his halachic novellae are requested.
        exclusions: &["Chidushei Agadot on"],
    },
    AuthorMapping {
        canonical: "Pnei Yehoshua",
        aliases: &["pnei yehoshua", "פני יהושע"],
        patterns: &["Penei Yehoshua on"],
        writes_on: WritesOn::Talmud,
        exclusions: &[],
    },
    AuthorMapping {
        canonical: "Rif",
        aliases: &["rif", "רי\"ף"],
        patterns: &["Rif"],
        writes_on: WritesOn::IsRifDigest,
        exclusions: &[],
    },
    AuthorMapping {
        canonical: "Ran",
        aliases: &["ran", "ר\"ן"],
        patterns: &["Ran on"],
        writes_on: WritesOn::RifDigest,
        exclusions: &["Ran on Nedarim"],
    },
    AuthorMapping {
        canonical: "Nimukei Yosef",
        aliases: &["nimukei yosef", "נמוקי יוסף"],
        patterns: &["Nimukei Yosef on"],
        writes_on: WritesOn::RifDigest,
        exclusions: &[],
    },
    AuthorMapping {
        canonical: "Rosh",
        aliases: &["rosh", "רא\"ש"],
        patterns: &["Rosh on"],
        writes_on: WritesOn::Talmud,
        exclusions: &["Tosafot HaRosh on"],
    },
    AuthorMapping {
        canonical: "Mishnah Berurah",
        aliases: &["mishnah berurah", "mishna berura", "משנה ברורה"],
        patterns: &["Mishnah Berurah"],
        writes_on: WritesOn::CodifiedLaw,
        exclusions: &[],
    },
    AuthorMapping {
        canonical: "Magen Avraham",
        aliases: &["magen avraham", "מגן אברהם"],
        patterns: &["Magen Avraham"],
        writes_on: WritesOn::CodifiedLaw,
        exclusions: &[],
    },
];

static AUTHOR_LOOKUP: Lazy<HashMap<&'static str, &'static AuthorMapping>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for mapping in AUTHORS {
        for alias in mapping.aliases {
            map.insert(*alias, mapping);
        }
    }
    map
});

/// A resolved reference rule for one author at one location.
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    pub author: &'static str,
    /// Fully constructed reference string for the commentary at `location`.
    pub reference: String,
    /// Patterns identifying this author's commentary layer, exclusion-filtered.
    pub patterns: Vec<&'static str>,
    pub exclusions: Vec<&'static str>,
    pub writes_on: WritesOn,
}

impl ReferencePattern {
    /// True when `candidate` names this author's commentary and is not one
    /// of the excluded same-named works.
    pub fn accepts(&self, candidate: &str) -> bool {
        if self.exclusions.iter().any(|ex| candidate.contains(ex)) {
            return false;
        }
        self.patterns.iter().any(|p| candidate.contains(p))
    }
}

/// Look up an author's mapping by any accepted spelling.
pub fn author_mapping(author: &str) -> Option<&'static AuthorMapping> {
    let key = author.trim().to_lowercase();
    AUTHOR_LOOKUP.get(key.as_str()).copied()
}

/// Resolve the reference-construction rule for `author` at `location`.
///
/// The exclusion filter is applied before anything is returned: a pattern
/// that also matches one of the author's exclusions is discarded, so a naive
/// prefix match can never leak an unrelated same-named work.
pub fn resolve(author: &str, location: &CorpusLocation) -> Result<ReferencePattern> {
    let mapping =
        author_mapping(author).ok_or_else(|| Error::UnknownAuthor(author.to_string()))?;

    let base = location.section_key();
    let reference = match mapping.writes_on {
        WritesOn::Talmud => format!("{} {}", mapping.patterns[0], base),
        // Codifier commentaries are addressed by siman alone.
        WritesOn::CodifiedLaw => format!("{} {}", mapping.patterns[0], base.section),
        // The digest keeps the base work's name but is its own work; the
        // text service resolves its folio concordance.
        WritesOn::RifDigest => format!("{} Rif {}", mapping.patterns[0], base),
        WritesOn::IsRifDigest => format!("Rif {base}"),
    };

    let patterns: Vec<&'static str> = mapping
        .patterns
        .iter()
        .copied()
        .filter(|p| !mapping.exclusions.iter().any(|ex| p.contains(ex)))
        .collect();
    if patterns.len() < mapping.patterns.len() {
        debug!(author = mapping.canonical, "pattern overlapped an exclusion, dropped");
    }

    Ok(ReferencePattern {
        author: mapping.canonical,
        reference,
        patterns,
        exclusions: mapping.exclusions.to_vec(),
        writes_on: mapping.writes_on,
    })
}
