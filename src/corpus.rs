//! Local corpus index.
//!
//! Loads a directory tree of JSON text exports into an immutable in-memory
//! index. Layout, one directory per base work:
//!
//! ```text
//! <root>/
//!   Pesachim/
//!     Hebrew/merged.json                     # base text
//!     Commentary/
//!       Rosh/Hebrew/merged.json              # one layer per commentator
//!       Ran/Hebrew/merged.json
//!   Shulchan Arukh, Orach Chayim/
//!     Hebrew/merged.json
//! ```
//!
//! `merged.json` carries the section texts as an array of arrays: one outer
//! element per section, inner elements are the section's atomic segments.
//! Folio-addressed works map array index 0 to daf 2a; siman-addressed works
//! map index 0 to siman 1. Commentary layers are aligned with the base text
//! by section index.
//!
//! The index is immutable after [`CorpusIndex::load`], so concurrent readers
//! never observe partial state.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::models::{CorpusEntry, CorpusLocation, Side};
use crate::normalize::{contains_word, normalize};

/// How a work's outer text array maps to subdivision coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    /// Index 0 is daf 2a, index 1 is daf 2b, and so on.
    Folio,
    /// Index 0 is siman 1.
    Siman,
}

impl Scheme {
    fn parse(label: Option<&str>) -> Self {
        match label {
            Some("folio") => Scheme::Folio,
            _ => Scheme::Siman,
        }
    }

    fn location(&self, work: &str, index: usize) -> CorpusLocation {
        match self {
            Scheme::Folio => {
                let daf = (index / 2 + 2) as u32;
                let side = if index % 2 == 0 { Side::A } else { Side::B };
                CorpusLocation::new(work, daf, Some(side))
            }
            Scheme::Siman => CorpusLocation::new(work, (index + 1) as u32, None),
        }
    }

    fn index(&self, location: &CorpusLocation) -> Option<usize> {
        match self {
            Scheme::Folio => {
                if location.section < 2 {
                    return None;
                }
                let base = (location.section as usize - 2) * 2;
                match location.side {
                    Some(Side::A) | None => Some(base),
                    Some(Side::B) => Some(base + 1),
                }
            }
            Scheme::Siman => {
                if location.section == 0 {
                    return None;
                }
                Some(location.section as usize - 1)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MergedText {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    scheme: Option<String>,
    text: Vec<Vec<String>>,
}

#[derive(Debug)]
struct Work {
    scheme: Scheme,
    entries: Vec<CorpusEntry>,
}

/// Immutable index over the local corpus tree.
#[derive(Debug)]
pub struct CorpusIndex {
    root: PathBuf,
    works: BTreeMap<String, Work>,
}

impl CorpusIndex {
    /// Load the corpus from `root`. Fails with
    /// [`Error::CorpusUnavailable`] when the directory is missing or holds
    /// no readable works; the caller is expected to fall back to an
    /// external discovery path.
    pub fn load(root: &Path) -> Result<CorpusIndex> {
        if !root.is_dir() {
            return Err(Error::corpus_unavailable(root, "root directory not found"));
        }

        let mut works: BTreeMap<String, Work> = BTreeMap::new();
        let mut layer_files: Vec<(String, String, PathBuf)> = Vec::new();

        for entry in WalkDir::new(root).min_depth(3).max_depth(5) {
            let entry = entry
                .map_err(|e| Error::corpus_unavailable(root, e.to_string()))?;
            if entry.file_name() != std::ffi::OsStr::new("merged.json") {
                continue;
            }
            let path = entry.path();
            let rel: Vec<String> = path
                .strip_prefix(root)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            match rel.as_slice() {
                // <work>/Hebrew/merged.json
                [work, hebrew, _] if hebrew == "Hebrew" => {
                    let merged = read_merged(path)?;
                    let work_name = merged.title.clone().unwrap_or_else(|| work.clone());
                    works.insert(work_name, build_work(work, merged));
                }
                // <work>/Commentary/<author>/Hebrew/merged.json
                [work, commentary, author, hebrew, _]
                    if commentary == "Commentary" && hebrew == "Hebrew" =>
                {
                    layer_files.push((work.clone(), author.clone(), path.to_path_buf()));
                }
                _ => {
                    debug!(path = %path.display(), "ignoring unrecognized corpus file");
                }
            }
        }

        if works.is_empty() {
            return Err(Error::corpus_unavailable(root, "no works found"));
        }

        // Attach commentary layers to their base sections by index.
        for (work_name, author, path) in layer_files {
            let Some(work) = works.get_mut(&work_name) else {
                warn!(work = %work_name, author = %author, "commentary layer without base text");
                continue;
            };
            let merged = read_merged(&path)?;
            for (index, segments) in merged.text.iter().enumerate() {
                if segments.is_empty() {
                    continue;
                }
                if let Some(entry) = work.entries.get_mut(index) {
                    entry.layers.insert(author.clone(), segments.join(" "));
                }
            }
        }

        debug!(works = works.len(), root = %root.display(), "corpus loaded");
        Ok(CorpusIndex {
            root: root.to_path_buf(),
            works,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up one section by structural coordinate.
    pub fn lookup(&self, location: &CorpusLocation) -> Option<&CorpusEntry> {
        let work = self.works.get(&location.work)?;
        let index = work.scheme.index(location)?;
        work.entries.get(index)
    }

    /// Search one work's base text for the given phrases. A phrase matches a
    /// section when every one of its words appears word-bounded in the
    /// section text. Results are ranked by phrase hit count, then by
    /// subdivision order, so the ordering is deterministic.
    pub fn search_text(&self, work: &str, phrases: &[String]) -> Vec<&CorpusEntry> {
        let Some(w) = self.works.get(work) else {
            return Vec::new();
        };
        let needles: Vec<Vec<String>> = phrases
            .iter()
            .map(|p| normalize(p).split(' ').map(str::to_string).collect())
            .collect();

        let mut scored: Vec<(usize, &CorpusEntry)> = Vec::new();
        for entry in &w.entries {
            let text = normalize(&entry.text());
            let hits = needles
                .iter()
                .filter(|words| {
                    !words.is_empty() && words.iter().all(|word| contains_word(&text, word))
                })
                .count();
            if hits > 0 {
                scored.push((hits, entry));
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.location.cmp(&b.1.location)));
        scored.into_iter().map(|(_, e)| e).collect()
    }

    /// All commentary layers attached to an entry, by layer name.
    pub fn commentary_layers<'a>(&self, entry: &'a CorpusEntry) -> &'a BTreeMap<String, String> {
        &entry.layers
    }

    pub fn work_names(&self) -> impl Iterator<Item = &str> {
        self.works.keys().map(String::as_str)
    }

    pub fn has_work(&self, work: &str) -> bool {
        self.works.contains_key(work)
    }

    /// (sections, commentary layers) counts for one work.
    pub fn work_stats(&self, work: &str) -> Option<(usize, usize)> {
        let w = self.works.get(work)?;
        let layers: std::collections::BTreeSet<&str> = w
            .entries
            .iter()
            .flat_map(|e| e.layers.keys().map(String::as_str))
            .collect();
        Some((w.entries.len(), layers.len()))
    }
}

fn read_merged(path: &Path) -> Result<MergedText> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::corpus_unavailable(path, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| Error::corpus_unavailable(path, e.to_string()))
}

fn build_work(dir_name: &str, merged: MergedText) -> Work {
    let scheme = Scheme::parse(merged.scheme.as_deref());
    let work_name = merged.title.unwrap_or_else(|| dir_name.to_string());
    let entries = merged
        .text
        .into_iter()
        .enumerate()
        .map(|(index, segments)| CorpusEntry {
            location: scheme.location(&work_name, index),
            segments,
            layers: BTreeMap::new(),
        })
        .collect();
    Work { scheme, entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_work(root: &Path, name: &str, scheme: &str, sections: &[&[&str]]) {
        let dir = root.join(name).join("Hebrew");
        fs::create_dir_all(&dir).unwrap();
        let text: Vec<Vec<&str>> = sections.iter().map(|s| s.to_vec()).collect();
        let body = serde_json::json!({ "title": name, "scheme": scheme, "text": text });
        fs::write(dir.join("merged.json"), body.to_string()).unwrap();
    }

    fn write_layer(root: &Path, work: &str, author: &str, sections: &[&[&str]]) {
        let dir = root.join(work).join("Commentary").join(author).join("Hebrew");
        fs::create_dir_all(&dir).unwrap();
        let text: Vec<Vec<&str>> = sections.iter().map(|s| s.to_vec()).collect();
        let body = serde_json::json!({ "title": author, "text": text });
        fs::write(dir.join("merged.json"), body.to_string()).unwrap();
    }

    #[test]
    fn load_fails_when_root_missing() {
        let err = CorpusIndex::load(Path::new("/nonexistent/corpus")).unwrap_err();
        assert!(matches!(err, Error::CorpusUnavailable { .. }));
    }

    #[test]
    fn load_fails_when_empty() {
        let tmp = TempDir::new().unwrap();
        let err = CorpusIndex::load(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::CorpusUnavailable { .. }));
    }

    #[test]
    fn folio_scheme_maps_index_zero_to_daf_2a() {
        let tmp = TempDir::new().unwrap();
        write_work(
            tmp.path(),
            "Pesachim",
            "folio",
            &[&["אור לארבעה עשר"], &["בודקין את החמץ"]],
        );
        let index = CorpusIndex::load(tmp.path()).unwrap();

        let loc = CorpusLocation::new("Pesachim", 2, Some(Side::A));
        let entry = index.lookup(&loc).unwrap();
        assert_eq!(entry.segments, vec!["אור לארבעה עשר".to_string()]);

        let loc_b = CorpusLocation::new("Pesachim", 2, Some(Side::B));
        assert!(index.lookup(&loc_b).is_some());
        let missing = CorpusLocation::new("Pesachim", 3, Some(Side::A));
        assert!(index.lookup(&missing).is_none());
    }

    #[test]
    fn siman_scheme_maps_index_zero_to_siman_1() {
        let tmp = TempDir::new().unwrap();
        write_work(tmp.path(), "Orach Chayim", "siman", &[&["סימן ראשון"]]);
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let loc = CorpusLocation::new("Orach Chayim", 1, None);
        assert!(index.lookup(&loc).is_some());
    }

    #[test]
    fn search_ranks_by_hit_count_then_subdivision() {
        let tmp = TempDir::new().unwrap();
        write_work(
            tmp.path(),
            "Orach Chayim",
            "siman",
            &[
                &["דין ביטול חמץ"],
                &["הלכות שבת"],
                &["ביטול חמץ ובדיקת חמץ"],
            ],
        );
        let index = CorpusIndex::load(tmp.path()).unwrap();
        let phrases = vec!["ביטול חמץ".to_string(), "בדיקת חמץ".to_string()];
        let results = index.search_text("Orach Chayim", &phrases);
        assert_eq!(results.len(), 2);
        // Siman 3 matches both phrases, siman 1 only one.
        assert_eq!(results[0].location.section, 3);
        assert_eq!(results[1].location.section, 1);
    }

    #[test]
    fn commentary_layers_align_by_section_index() {
        let tmp = TempDir::new().unwrap();
        write_work(tmp.path(), "Pesachim", "folio", &[&["א"], &["ב"]]);
        write_layer(tmp.path(), "Pesachim", "Rosh", &[&[], &["פירוש הרא\"ש"]]);
        let index = CorpusIndex::load(tmp.path()).unwrap();

        let a = index
            .lookup(&CorpusLocation::new("Pesachim", 2, Some(Side::A)))
            .unwrap();
        assert!(index.commentary_layers(a).is_empty());

        let b = index
            .lookup(&CorpusLocation::new("Pesachim", 2, Some(Side::B)))
            .unwrap();
        assert_eq!(
            index.commentary_layers(b).get("Rosh").map(String::as_str),
            Some("פירוש הרא\"ש")
        );
    }
}
