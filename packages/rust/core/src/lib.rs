//! Pipeline stages downstream of research: curation, briefing synthesis,
//! report editing, and the end-to-end orchestration.
//!
//! [`pipeline::run_research`] drives the whole run: four parallel
//! researchers, the collection check, the [`Curator`], the [`Briefing`]
//! orchestrator, and the [`Editor`].

pub mod briefing;
pub mod curator;
pub mod editor;
pub mod pipeline;
pub mod prompts;
pub mod references;

pub use briefing::Briefing;
pub use curator::{Curator, normalize_url};
pub use editor::Editor;
pub use pipeline::{ResearchRequest, run_research};
pub use references::{format_references_section, select_references};
