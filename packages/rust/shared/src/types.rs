//! Core domain types for companyscout research runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for research job identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// One of the four parallel research tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Financial,
    News,
    Industry,
    Company,
}

impl Category {
    /// All categories in research order.
    pub const ALL: [Category; 4] = [
        Category::Financial,
        Category::News,
        Category::Industry,
        Category::Company,
    ];

    /// Categories in the order the editor compiles briefings.
    pub const COMPILE_ORDER: [Category; 4] = [
        Category::Company,
        Category::Industry,
        Category::Financial,
        Category::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Financial => "financial",
            Category::News => "news",
            Category::Industry => "industry",
            Category::Company => "company",
        }
    }

    /// Human-readable label used in status messages.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Financial => "Financial",
            Category::News => "News",
            Category::Industry => "Industry",
            Category::Company => "Company",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocSource {
    /// Found via the web-search service.
    WebSearch,
    /// First-party content scraped from the company's own site. Exempt from
    /// the relevance threshold during curation.
    CompanyWebsite,
    /// Any other origin.
    #[serde(untagged)]
    Other(String),
}

/// Relevance evaluation attached by the curator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score: f64,
    pub query: String,
}

/// A single evidence document gathered for one category.
///
/// Identity is the normalized URL. `score: None` models a score the search
/// service returned in an unparsable form; evaluation coerces it to 0.0, so
/// such documents drop via the relevance threshold unless they are
/// first-party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    /// The search query that produced this document.
    #[serde(default)]
    pub query: String,
    pub source: DocSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Category tag applied during curation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<Category>,
    /// Attached by the curator; never mutated after briefing consumes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

impl Document {
    /// Create a document with the required fields. Everything else is
    /// optional and filled in by later stages.
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            content: content.into(),
            raw_content: None,
            query: String::new(),
            source: DocSource::WebSearch,
            score: None,
            doc_type: None,
            evaluation: None,
        }
    }

    /// Score attached by the curator, 0.0 if not yet evaluated.
    pub fn overall_score(&self) -> f64 {
        self.evaluation
            .as_ref()
            .map(|e| e.overall_score)
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// DocumentSet
// ---------------------------------------------------------------------------

/// An insertion-ordered collection of documents keyed by URL.
///
/// Inserting under an existing URL replaces the stored document in place:
/// the last value wins but the original position is kept. Iteration is in
/// insertion order. Both properties matter — the researcher merge relies on
/// last-wins replacement, and the curator's first-wins dedup walks entries
/// in the order they were inserted.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    docs: Vec<Document>,
    index: HashMap<String, usize>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document keyed by its URL. Replaces in place on collision.
    pub fn insert(&mut self, doc: Document) {
        match self.index.get(&doc.url) {
            Some(&i) => self.docs[i] = doc,
            None => {
                self.index.insert(doc.url.clone(), self.docs.len());
                self.docs.push(doc);
            }
        }
    }

    /// Merge another set into this one (last-wins, same as repeated insert).
    pub fn extend(&mut self, other: DocumentSet) {
        for doc in other.docs {
            self.insert(doc);
        }
    }

    pub fn get(&self, url: &str) -> Option<&Document> {
        self.index.get(url).map(|&i| &self.docs[i])
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }
}

impl FromIterator<Document> for DocumentSet {
    fn from_iter<T: IntoIterator<Item = Document>>(iter: T) -> Self {
        let mut set = DocumentSet::new();
        for doc in iter {
            set.insert(doc);
        }
        set
    }
}

impl IntoIterator for DocumentSet {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

// ---------------------------------------------------------------------------
// CategoryTable
// ---------------------------------------------------------------------------

/// One value per research category.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable<T> {
    pub financial: T,
    pub news: T,
    pub industry: T,
    pub company: T,
}

impl<T> CategoryTable<T> {
    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Financial => &self.financial,
            Category::News => &self.news,
            Category::Industry => &self.industry,
            Category::Company => &self.company,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Financial => &mut self.financial,
            Category::News => &mut self.news,
            Category::Industry => &mut self.industry,
            Category::Company => &mut self.company,
        }
    }
}

// ---------------------------------------------------------------------------
// ReferenceInfo
// ---------------------------------------------------------------------------

/// Side metadata for one selected reference URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceInfo {
    pub score: f64,
    pub doc_type: Category,
}

// ---------------------------------------------------------------------------
// ResearchState
// ---------------------------------------------------------------------------

/// Report output nested under the editor stage.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub report: String,
}

/// Shared mutable context threaded through every pipeline stage.
///
/// Each stage reads the fields it depends on and writes only its own output
/// fields; the state becomes read-only once the editor finishes.
#[derive(Debug, Clone)]
pub struct ResearchState {
    pub company: String,
    pub company_url: Option<String>,
    pub industry: String,
    pub hq_location: String,
    pub job_id: JobId,

    /// Append-only log of human-readable stage messages.
    pub messages: Vec<String>,

    /// First-party documents seeded from the company site scrape.
    pub site_scrape: DocumentSet,

    /// Raw researcher output per category.
    pub data: CategoryTable<DocumentSet>,

    /// Curated output per category: ranked, capped, threshold-filtered.
    pub curated: CategoryTable<Vec<Document>>,

    /// Briefing prose per category (empty string when no data existed).
    pub briefing: CategoryTable<String>,

    /// Briefings keyed by category, populated by the orchestrator.
    pub briefings: HashMap<Category, String>,

    /// Bounded reference list selected during curation.
    pub references: Vec<String>,
    pub reference_titles: HashMap<String, String>,
    pub reference_info: HashMap<String, ReferenceInfo>,

    /// The final compiled report.
    pub report: String,
    pub editor: EditorState,

    pub status: String,
}

impl ResearchState {
    pub fn new(
        company: impl Into<String>,
        industry: impl Into<String>,
        hq_location: impl Into<String>,
        job_id: JobId,
    ) -> Self {
        Self {
            company: company.into(),
            company_url: None,
            industry: industry.into(),
            hq_location: hq_location.into(),
            job_id,
            messages: Vec::new(),
            site_scrape: DocumentSet::new(),
            data: CategoryTable::default(),
            curated: CategoryTable::default(),
            briefing: CategoryTable::default(),
            briefings: HashMap::new(),
            references: Vec::new(),
            reference_titles: HashMap::new(),
            reference_info: HashMap::new(),
            report: String::new(),
            editor: EditorState::default(),
            status: "pending".into(),
        }
    }

    pub fn push_message(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }
}
