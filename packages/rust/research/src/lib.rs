//! Per-category researchers and the collection checkpoint.
//!
//! A [`Researcher`] streams query generation from the completion service,
//! fans out one search call per query in parallel with per-query failure
//! isolation, and merges results keyed by URL. [`collector::collect`] then
//! verifies what the four parallel tracks produced before curation.

pub mod collector;
pub mod prompts;
pub mod researcher;

pub use researcher::{MAX_QUERIES, Researcher, ResearcherOutput, clean_title};
