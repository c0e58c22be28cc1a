//! # Mekorot
//!
//! Citation-graph discovery and topic-filtered retrieval over a layered
//! Torah corpus.
//!
//! Mekorot turns a set of Hebrew topic terms into a ranked list of
//! foundational Talmudic locations by mining the citations that later
//! codified layers and their commentaries make ("trickle-down"), then
//! assembles the requested commentators' material for exactly the sub-spans
//! of those locations that discuss the topic.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌───────────────┐
//! │ CorpusIndex  │──▶│ Discoverer │──▶│ ranked hits    │
//! │ (local JSON) │   │ +Citations │   └──────┬────────┘
//! └──────────────┘   └────────────┘          │
//!                                            ▼
//!                    ┌────────────┐   ┌───────────────┐
//!                    │ TextSource │◀──│ Orchestrator   │
//!                    │ (HTTP/mock)│   │ +SegmentScorer │
//!                    └────────────┘   │ +AuthorResolver│
//!                                     └──────┬────────┘
//!                                            ▼
//!                                   attributed source list
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mkm corpus stats
//! mkm discover "ביטול חמץ"
//! mkm retrieve "ביטול חמץ" --author ran --author rashi --primary ran
//! mkm segments Pesachim 4b "ביטול חמץ"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Hebrew normalization and term variants |
//! | [`corpus`] | Local corpus index |
//! | [`citations`] | Citation extraction from commentary prose |
//! | [`discover`] | Layered evidence search and ranking |
//! | [`segments`] | Per-segment relevance scoring |
//! | [`authors`] | Commentator reference resolution |
//! | [`fetch`] | External text-retrieval boundary |
//! | [`retrieve`] | Retrieval orchestration |
//! | [`error`] | Typed failure taxonomy |

pub mod authors;
pub mod citations;
pub mod config;
pub mod corpus;
pub mod discover;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod retrieve;
pub mod segments;
