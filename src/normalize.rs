//! Hebrew text normalization, letter-numeral parsing, and term-variant
//! expansion.
//!
//! Everything here is a pure function. Normalization runs before any pattern
//! matching in the extractor and scorer, and it is idempotent: applying it to
//! already-normalized text is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip markup, vowel points, and cantillation; unify punctuation variants;
/// collapse whitespace.
pub fn normalize(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, " ");
    let mut out = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        match ch {
            // Cantillation marks and vowel points.
            '\u{0591}'..='\u{05BD}' | '\u{05BF}'..='\u{05C7}' => {}
            // Maqaf joins words; treat as a space so both halves stay words.
            '\u{05BE}' => out.push(' '),
            // Gershayim and its typographic look-alikes.
            '\u{05F4}' | '“' | '”' | '„' => out.push('"'),
            // Geresh and curly apostrophes.
            '\u{05F3}' | '‘' | '’' => out.push('\''),
            _ => out.push(ch),
        }
    }
    WS_RE.replace_all(out.trim(), " ").to_string()
}

fn letter_value(ch: char) -> Option<u32> {
    Some(match ch {
        'א' => 1,
        'ב' => 2,
        'ג' => 3,
        'ד' => 4,
        'ה' => 5,
        'ו' => 6,
        'ז' => 7,
        'ח' => 8,
        'ט' => 9,
        'י' => 10,
        'כ' | 'ך' => 20,
        'ל' => 30,
        'מ' | 'ם' => 40,
        'נ' | 'ן' => 50,
        'ס' => 60,
        'ע' => 70,
        'פ' | 'ף' => 80,
        'צ' | 'ץ' => 90,
        'ק' => 100,
        'ר' => 200,
        'ש' => 300,
        'ת' => 400,
        _ => return None,
    })
}

/// Parse a Hebrew letter-numeral (gematria) token: `ד` = 4, `יב` = 12,
/// `קכא` = 121. Quote marks conventionally embedded in numerals are ignored.
/// Returns `None` for anything containing a non-numeral character.
pub fn hebrew_numeral(token: &str) -> Option<u32> {
    let mut total = 0u32;
    let mut seen = false;
    for ch in token.chars() {
        if ch == '"' || ch == '\'' {
            continue;
        }
        total += letter_value(ch)?;
        seen = true;
    }
    if seen {
        Some(total)
    } else {
        None
    }
}

/// Parse a subdivision number in either Arabic or Hebrew letter-numeral form.
pub fn parse_section_number(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return Some(n);
    }
    hebrew_numeral(token)
}

/// One expanded form of a search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVariant {
    pub text: String,
    /// True for grammatical bound-construct forms, which are as
    /// distinguishing as full phrases.
    pub construct: bool,
}

impl TermVariant {
    fn plain(text: String) -> Self {
        Self {
            text,
            construct: false,
        }
    }

    fn bound(text: String) -> Self {
        Self {
            text,
            construct: true,
        }
    }
}

/// Expand a term into the morphological variants that should count as a
/// match: the term itself, with/without a leading determiner, the
/// bound-construct form, and the unspaced compound form.
pub fn expand_variants(term: &str) -> Vec<TermVariant> {
    let term = normalize(term);
    let mut variants = vec![TermVariant::plain(term.clone())];
    let words: Vec<&str> = term.split(' ').collect();

    if words.len() == 1 {
        let word = words[0];
        if let Some(stripped) = word.strip_prefix('ה') {
            if stripped.chars().count() >= 2 {
                variants.push(TermVariant::plain(stripped.to_string()));
            }
        } else {
            variants.push(TermVariant::plain(format!("ה{word}")));
        }
        // Feminine nouns take a construct ending when bound to the next word.
        if let Some(stem) = word.strip_suffix('ה') {
            variants.push(TermVariant::bound(format!("{stem}ת")));
        }
    } else {
        let last = words[words.len() - 1];
        if !last.starts_with('ה') {
            let mut with_det = words[..words.len() - 1].join(" ");
            with_det.push_str(" ה");
            with_det.push_str(last);
            variants.push(TermVariant::plain(with_det));
        }
        if let Some(stem) = words[0].strip_suffix('ה') {
            let mut bound = format!("{stem}ת");
            for word in &words[1..] {
                bound.push(' ');
                bound.push_str(word);
            }
            variants.push(TermVariant::bound(bound));
        }
        if words.len() == 2 {
            variants.push(TermVariant::plain(words.join("")));
        }
    }

    variants.dedup_by(|a, b| a.text == b.text);
    variants
}

/// Whole-word containment check: `needle` must match on word boundaries, so
/// a short term never matches inside a longer unrelated word.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let hay: Vec<char> = haystack.chars().collect();
    let ndl: Vec<char> = needle.chars().collect();
    let n = ndl.len();
    if n > hay.len() {
        return false;
    }
    for start in 0..=(hay.len() - n) {
        if hay[start..start + n] != ndl[..] {
            continue;
        }
        let left_ok = start == 0 || !hay[start - 1].is_alphanumeric();
        let end = start + n;
        let right_ok = end == hay.len() || !hay[end].is_alphanumeric();
        if left_ok && right_ok {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let raw = "<b>בָּדַק</b>  אֶת־הַבַּיִת";
        let once = normalize(raw);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_strips_markup_and_points() {
        let raw = "<i>בְּדִיקַת</i> חָמֵץ";
        assert_eq!(normalize(raw), "בדיקת חמץ");
    }

    #[test]
    fn normalize_unifies_gershayim() {
        assert_eq!(normalize("ב\u{05F4}ק"), "ב\"ק");
    }

    #[test]
    fn hebrew_numerals_sum_letter_values() {
        assert_eq!(hebrew_numeral("ד"), Some(4));
        assert_eq!(hebrew_numeral("יב"), Some(12));
        assert_eq!(hebrew_numeral("קכא"), Some(121));
        assert_eq!(hebrew_numeral("י\"ב"), Some(12));
        assert_eq!(hebrew_numeral("4b"), None);
    }

    #[test]
    fn parse_section_number_accepts_both_notations() {
        assert_eq!(parse_section_number("17"), Some(17));
        assert_eq!(parse_section_number("יז"), Some(17));
        assert_eq!(parse_section_number("פד"), Some(84));
    }

    #[test]
    fn variants_include_determiner_and_construct_forms() {
        let variants = expand_variants("בדיקה");
        let texts: Vec<&str> = variants.iter().map(|v| v.text.as_str()).collect();
        assert!(texts.contains(&"בדיקה"));
        assert!(texts.contains(&"הבדיקה"));
        assert!(texts.contains(&"בדיקת"));
        assert!(variants.iter().any(|v| v.construct && v.text == "בדיקת"));
    }

    #[test]
    fn phrase_variants_cover_determiner_on_last_word() {
        let variants = expand_variants("ביטול חמץ");
        let texts: Vec<&str> = variants.iter().map(|v| v.text.as_str()).collect();
        assert!(texts.contains(&"ביטול חמץ"));
        assert!(texts.contains(&"ביטול החמץ"));
        assert!(texts.contains(&"ביטולחמץ"));
    }

    #[test]
    fn contains_word_respects_boundaries() {
        assert!(contains_word("כאן מוקף צף", "מוקף"));
        assert!(!contains_word("בדיקת חמץ", "דיקת"));
        assert!(contains_word("ביטול חמץ בלילה", "ביטול חמץ"));
    }
}
