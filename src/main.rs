//! # Mekorot CLI (`mkm`)
//!
//! The `mkm` binary is a development driver for the discovery and retrieval
//! library. It is deliberately thin: every command loads the TOML config,
//! builds the corpus index, and calls straight into the library.
//!
//! ## Usage
//!
//! ```bash
//! mkm --config ./config/mekorot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mkm corpus stats` | Show the loaded works and their commentary layers |
//! | `mkm discover "<topic>"...` | Rank Talmudic locations by citation evidence |
//! | `mkm retrieve "<topic>"... --author <a>` | Assemble commentary sources for a topic |
//! | `mkm segments <work> <daf> "<term>"...` | Score one section's segments against terms |
//!
//! ## Examples
//!
//! ```bash
//! # Where do the codifiers point for bitul chametz?
//! mkm discover "ביטול חמץ"
//!
//! # Fetch the Ran and Rashi on the discovered sugyos, Ran first
//! mkm retrieve "ביטול חמץ" --author ran --author rashi --primary ran
//!
//! # Which lines of Pesachim 4b actually discuss it?
//! mkm segments Pesachim 4b "ביטול חמץ"
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mekorot::config;
use mekorot::corpus::CorpusIndex;
use mekorot::discover::Discoverer;
use mekorot::fetch::HttpTextSource;
use mekorot::models::{CorpusLocation, RetrievalPhase, Side, TopicQuery};
use mekorot::retrieve::{AuthorRequest, RetrievalOrchestrator};
use mekorot::segments::SegmentScorer;

/// Mekorot — citation-graph discovery and topic-filtered retrieval over a
/// layered Torah corpus.
#[derive(Parser)]
#[command(
    name = "mkm",
    about = "Mekorot — citation-graph discovery and topic-filtered retrieval over a layered Torah corpus",
    version,
    long_about = "Mekorot mines the citations that codified layers and their commentaries make \
    to rank the foundational Talmudic locations for a topic, then assembles the requested \
    commentators' material for exactly the sub-spans that discuss it."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mekorot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank foundational locations by aggregated citation evidence.
    ///
    /// Searches each configured evidence layer for the topic terms, extracts
    /// the citations their commentaries make, and prints the ranked targets
    /// with per-layer score breakdowns.
    Discover {
        /// Topic terms (Hebrew phrases). More than one enables the
        /// intersection-first multi-topic policy.
        #[arg(required = true)]
        topics: Vec<String>,
        /// Focus terms narrowing the topic to a sub-aspect.
        #[arg(long)]
        focus: Vec<String>,
        /// Restrict targets to these works.
        #[arg(long = "work")]
        works: Vec<String>,
    },

    /// Discover, then fetch and rank the requested commentators' material.
    ///
    /// Commentary is requested only for the segments of each discovered
    /// location that score as relevant, never for whole works.
    Retrieve {
        /// Topic terms (Hebrew phrases).
        #[arg(required = true)]
        topics: Vec<String>,
        /// Requested commentator (repeatable).
        #[arg(long = "author", required = true)]
        authors: Vec<String>,
        /// The author whose sources lead the final ordering.
        #[arg(long)]
        primary: Option<String>,
        /// Focus terms narrowing the topic to a sub-aspect.
        #[arg(long)]
        focus: Vec<String>,
        /// Restrict discovery targets to these works.
        #[arg(long = "work")]
        works: Vec<String>,
    },

    /// Score one section's segments against topic terms.
    Segments {
        /// Work name as it appears in the corpus (e.g. `Pesachim`).
        work: String,
        /// Subdivision, with folio side for daf-addressed works (e.g. `4b`).
        section: String,
        /// Terms to score against.
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Corpus inspection.
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },
}

#[derive(Subcommand)]
enum CorpusAction {
    /// List loaded works with section and commentary-layer counts.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Discover {
            topics,
            focus,
            works,
        } => {
            let index = CorpusIndex::load(&cfg.corpus.root)?;
            let query = TopicQuery::new(topics).with_focus(focus);
            let result = Discoverer::new(&index, &cfg.discovery).discover(&query, &works);

            if result.low_confidence {
                println!("No citation evidence found (low confidence, empty result).");
                return Ok(());
            }
            println!("Mode: {:?}", result.mode);
            for (rank, hit) in result.hits.iter().enumerate() {
                println!(
                    "{:>2}. {:<24} score {:.2}  (topics: {})",
                    rank + 1,
                    hit.target.to_string(),
                    hit.score,
                    hit.topic_count
                );
                for (layer, weight) in &hit.layer_breakdown {
                    println!("      {layer}: {weight:.2}");
                }
            }
        }

        Commands::Retrieve {
            topics,
            authors,
            primary,
            focus,
            works,
        } => {
            let index = match CorpusIndex::load(&cfg.corpus.root) {
                Ok(index) => index,
                Err(err) => {
                    println!("Phase: {}", RetrievalPhase::Failed);
                    return Err(err.into());
                }
            };
            let query = TopicQuery::new(topics).with_focus(focus);
            let discovery = Discoverer::new(&index, &cfg.discovery).discover(&query, &works);
            if discovery.low_confidence {
                println!("No citation evidence found (low confidence, empty result).");
                return Ok(());
            }

            let requested: Vec<AuthorRequest> = authors
                .iter()
                .map(|name| {
                    let is_primary = primary
                        .as_deref()
                        .is_some_and(|p| p.eq_ignore_ascii_case(name));
                    AuthorRequest {
                        name: name.clone(),
                        primary: is_primary,
                    }
                })
                .collect();

            let source = HttpTextSource::new(&cfg.fetch)?;
            let orchestrator = RetrievalOrchestrator::new(&source, &cfg.scoring, &cfg.fetch);
            let result = orchestrator
                .retrieve(&discovery.hits, &requested, &query)
                .await?;

            println!(
                "Phase: {}  ({} sources, {} locations, {} relevant segments)",
                result.phase,
                result.sources.len(),
                result.locations_fetched,
                result.relevant_segments
            );
            let mut current_author = String::new();
            for record in &result.sources {
                if record.author != current_author {
                    current_author = record.author.clone();
                    let tag = if record.is_primary { " (primary)" } else { "" };
                    println!("\n== {}{tag} ==", record.author);
                }
                println!(
                    "  {:<36} focus {:.1}  [{}]",
                    record.reference,
                    record.focus_score,
                    record.matched_terms.join(", ")
                );
            }
        }

        Commands::Segments {
            work,
            section,
            terms,
        } => {
            let index = CorpusIndex::load(&cfg.corpus.root)?;
            let location = parse_location(&work, &section)?;
            let Some(entry) = index.lookup(&location) else {
                bail!("{location} is not in the corpus");
            };
            let scorer = SegmentScorer::new(&cfg.scoring);
            let scored = scorer.score(&entry.segments, &[], &terms);
            for segment in &scored {
                let marker = if segment.is_relevant { "*" } else { " " };
                println!(
                    "{marker} {:>3}  {:.1}  {}",
                    segment.index + 1,
                    segment.combined_score,
                    truncate(&segment.text, 60)
                );
            }
        }

        Commands::Corpus { action } => match action {
            CorpusAction::Stats => {
                let index = CorpusIndex::load(&cfg.corpus.root)?;
                println!("Corpus root: {}", index.root().display());
                for work in index.work_names() {
                    if let Some((sections, layers)) = index.work_stats(work) {
                        println!("  {work:<32} {sections:>4} sections, {layers} commentary layers");
                    }
                }
            }
        },
    }

    Ok(())
}

/// Parse a subdivision like `4b`, `17a`, or `431` into a location.
fn parse_location(work: &str, section: &str) -> Result<CorpusLocation> {
    let (digits, side) = match section.chars().last() {
        Some('a') => (&section[..section.len() - 1], Some(Side::A)),
        Some('b') => (&section[..section.len() - 1], Some(Side::B)),
        _ => (section, None),
    };
    let number: u32 = digits
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid subdivision '{section}'"))?;
    Ok(CorpusLocation::new(work, number, side))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
