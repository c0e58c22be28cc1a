use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
}

/// One evidence layer: a base-work category searched during discovery, with
/// its trust weight as a citer.
#[derive(Debug, Deserialize, Clone)]
pub struct LayerConfig {
    pub name: String,
    pub work: String,
    #[serde(default = "default_layer_weight")]
    pub weight: f64,
}

fn default_layer_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_per_layer_cap")]
    pub per_layer_cap: usize,
    #[serde(default = "default_multi_topic_bonus")]
    pub multi_topic_bonus: f64,
    #[serde(default = "default_combined_phrase_max_words")]
    pub combined_phrase_max_words: usize,
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            per_layer_cap: default_per_layer_cap(),
            multi_topic_bonus: default_multi_topic_bonus(),
            combined_phrase_max_words: default_combined_phrase_max_words(),
            layers: default_layers(),
        }
    }
}

fn default_top_k() -> usize {
    10
}
fn default_per_layer_cap() -> usize {
    20
}
fn default_multi_topic_bonus() -> f64 {
    3.0
}
fn default_combined_phrase_max_words() -> usize {
    6
}

/// The codified law is the most authoritative citer; its derivative
/// commentary slightly less; the cross-reference gloss least.
fn default_layers() -> Vec<LayerConfig> {
    vec![
        LayerConfig {
            name: "codified".to_string(),
            work: "Shulchan Arukh, Orach Chayim".to_string(),
            weight: 1.0,
        },
        LayerConfig {
            name: "derivative".to_string(),
            work: "Mishnah Berurah".to_string(),
            weight: 0.75,
        },
        LayerConfig {
            name: "cross-reference".to_string(),
            work: "Be'er Heitev".to_string(),
            weight: 0.5,
        },
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "default_phrase_points")]
    pub phrase_points: f64,
    #[serde(default = "default_word_points")]
    pub word_points: f64,
    #[serde(default = "default_generic_points")]
    pub generic_points: f64,
    #[serde(default = "default_focus_weight")]
    pub focus_weight: f64,
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    #[serde(default = "default_generic_terms")]
    pub generic_terms: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            phrase_points: default_phrase_points(),
            word_points: default_word_points(),
            generic_points: default_generic_points(),
            focus_weight: default_focus_weight(),
            relevance_threshold: default_relevance_threshold(),
            generic_terms: default_generic_terms(),
        }
    }
}

fn default_phrase_points() -> f64 {
    3.0
}
fn default_word_points() -> f64 {
    1.5
}
fn default_generic_points() -> f64 {
    0.5
}
fn default_focus_weight() -> f64 {
    2.0
}
fn default_relevance_threshold() -> f64 {
    3.0
}

/// Words too common across the corpus to be distinguishing on their own.
fn default_generic_terms() -> Vec<String> {
    ["דין", "הלכה", "ענין", "דבר", "טעם", "מנהג"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_locations")]
    pub max_locations: usize,
    #[serde(default = "default_max_per_author")]
    pub max_per_author: usize,
    #[serde(default = "default_max_total")]
    pub max_total: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_locations: default_max_locations(),
            max_per_author: default_max_per_author(),
            max_total: default_max_total(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.sefaria.org/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_max_locations() -> usize {
    10
}
fn default_max_per_author() -> usize {
    5
}
fn default_max_total() -> usize {
    50
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate discovery
    if config.discovery.top_k < 1 {
        anyhow::bail!("discovery.top_k must be >= 1");
    }
    if config.discovery.per_layer_cap < 1 {
        anyhow::bail!("discovery.per_layer_cap must be >= 1");
    }
    if config.discovery.multi_topic_bonus < 1.0 {
        anyhow::bail!("discovery.multi_topic_bonus must be >= 1.0");
    }
    if config.discovery.layers.is_empty() {
        anyhow::bail!("discovery.layers must name at least one evidence layer");
    }
    for layer in &config.discovery.layers {
        if !(0.0..=1.0).contains(&layer.weight) || layer.weight == 0.0 {
            anyhow::bail!(
                "discovery layer '{}' weight must be in (0.0, 1.0]",
                layer.name
            );
        }
    }

    // Validate scoring
    if config.scoring.relevance_threshold <= 0.0 {
        anyhow::bail!("scoring.relevance_threshold must be > 0");
    }
    if config.scoring.focus_weight <= 0.0 {
        anyhow::bail!("scoring.focus_weight must be > 0");
    }

    // Validate fetch
    if config.fetch.max_per_author < 1 || config.fetch.max_total < 1 {
        anyhow::bail!("fetch.max_per_author and fetch.max_total must be >= 1");
    }
    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let file = write_config("[corpus]\nroot = \"/srv/corpus\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.discovery.top_k, 10);
        assert_eq!(config.discovery.per_layer_cap, 20);
        assert!((config.discovery.multi_topic_bonus - 3.0).abs() < 1e-9);
        assert!((config.scoring.relevance_threshold - 3.0).abs() < 1e-9);
        assert_eq!(config.fetch.max_per_author, 5);
        assert_eq!(config.fetch.max_total, 50);
        assert_eq!(config.discovery.layers.len(), 3);
    }

    #[test]
    fn zero_weight_layer_rejected() {
        let file = write_config(
            "[corpus]\nroot = \"/srv/corpus\"\n\n[[discovery.layers]]\nname = \"x\"\nwork = \"W\"\nweight = 0.0\n",
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn bad_bonus_rejected() {
        let file = write_config(
            "[corpus]\nroot = \"/srv/corpus\"\n\n[discovery]\nmulti_topic_bonus = 0.5\n",
        );
        assert!(load_config(file.path()).is_err());
    }
}
