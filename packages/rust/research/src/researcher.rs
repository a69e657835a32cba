//! Per-category researcher: streaming query generation and parallel search
//! fan-out.
//!
//! Each researcher streams query generation from the completion service
//! (caps at 4 queries), issues one search call per query in parallel,
//! tolerates individual query failures, and merges results keyed by URL —
//! last-processed query wins on collision.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use companyscout_providers::{
    CompletionProvider, Prompt, SearchParams, SearchProvider, SearchResult,
};
use companyscout_shared::{
    Category, DocSource, Document, DocumentSet, ProgressEvent, ProgressLog, ResearchState, Result,
    ScoutError,
};

use crate::prompts::{QUERY_FORMAT_GUIDELINES, query_prompt};

/// Default cap on generated queries per category.
pub const MAX_QUERIES: usize = 4;

/// What one researcher contributes back to the shared state.
#[derive(Debug)]
pub struct ResearcherOutput {
    pub category: Category,
    pub documents: DocumentSet,
    pub messages: Vec<String>,
}

/// One category's research track.
pub struct Researcher<C, S> {
    category: Category,
    completion: Arc<C>,
    search: Arc<S>,
    log: ProgressLog,
    max_queries: usize,
}

impl<C: CompletionProvider, S: SearchProvider> Researcher<C, S> {
    pub fn new(category: Category, completion: Arc<C>, search: Arc<S>, log: ProgressLog) -> Self {
        Self {
            category,
            completion,
            search,
            log,
            max_queries: MAX_QUERIES,
        }
    }

    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = max_queries;
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Stream query generation from the completion service.
    ///
    /// Deltas accumulate into a buffer; every newline finalizes one query
    /// (trimmed, empty lines discarded). A non-empty remainder after the
    /// stream ends becomes the final query. The result is truncated to the
    /// first `max_queries`; zero queries is fatal for this researcher.
    #[instrument(skip_all, fields(category = %self.category, company = %state.company))]
    pub async fn generate_queries(&self, state: &ResearchState) -> Result<Vec<String>> {
        let now = Utc::now();
        let task = query_prompt(self.category).replace("{company}", &state.company);
        let guidelines = QUERY_FORMAT_GUIDELINES.replace("{company}", &state.company);

        let prompt = Prompt::user(format!(
            "Research target: {} (as of {}, {}).\n{}\n{}",
            state.company,
            now.format("%Y"),
            now.format("%B %d, %Y"),
            task,
            guidelines,
        ))
        .with_system(format!(
            "You are researching {}, operating in the {} industry, headquartered in {}.",
            state.company, state.industry, state.hq_location,
        ));

        let (tx, mut rx) = mpsc::channel::<String>(64);
        let completion = Arc::clone(&self.completion);
        let stream_task = tokio::spawn(async move { completion.complete_stream(&prompt, tx).await });

        let mut queries: Vec<String> = Vec::new();
        let mut current = String::new();

        while let Some(delta) = rx.recv().await {
            current.push_str(&delta);

            self.log.append(
                &state.job_id,
                ProgressEvent::QueryGenerating {
                    query: current.clone(),
                    query_number: queries.len() + 1,
                    category: self.category,
                },
            );

            // Every newline finalizes one query.
            while let Some(pos) = current.find('\n') {
                let line: String = current.drain(..=pos).collect();
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                queries.push(query.to_string());
                self.log.append(
                    &state.job_id,
                    ProgressEvent::QueryGenerated {
                        query: query.to_string(),
                        query_number: queries.len(),
                        category: self.category,
                    },
                );
            }
        }

        // The stream is drained; surface any completion-service failure.
        stream_task
            .await
            .map_err(|e| ScoutError::completion(format!("query generation task failed: {e}")))??;

        // Flush the remainder as the final query.
        let remainder = current.trim();
        if !remainder.is_empty() {
            queries.push(remainder.to_string());
            self.log.append(
                &state.job_id,
                ProgressEvent::QueryGenerated {
                    query: remainder.to_string(),
                    query_number: queries.len(),
                    category: self.category,
                },
            );
        }

        if queries.is_empty() {
            return Err(ScoutError::validation(format!(
                "no queries generated for {}",
                state.company
            )));
        }

        queries.truncate(self.max_queries);
        info!(count = queries.len(), "queries finalized");

        self.log.append(
            &state.job_id,
            ProgressEvent::QueriesComplete {
                queries: queries.clone(),
                count: queries.len(),
                category: self.category,
            },
        );

        Ok(queries)
    }

    /// Issue one search call per query, all in parallel. A failed query
    /// emits a `query_error` event and is skipped; it never cancels the
    /// others. Results merge into one URL-keyed set — last-processed query
    /// wins on collision.
    #[instrument(skip_all, fields(category = %self.category, queries = queries.len()))]
    pub async fn search_documents(
        &self,
        state: &ResearchState,
        queries: &[String],
    ) -> Result<DocumentSet> {
        if queries.is_empty() {
            self.log.append(
                &state.job_id,
                ProgressEvent::Error {
                    error: "no valid queries to search".into(),
                    category: Some(self.category),
                    step: Some("Search".into()),
                },
            );
            return Ok(DocumentSet::new());
        }

        self.log.append(
            &state.job_id,
            ProgressEvent::SearchStarted {
                total_queries: queries.len(),
                category: self.category,
            },
        );

        let params = SearchParams::for_category(self.category);
        let mut handles = Vec::with_capacity(queries.len());
        for query in queries {
            let search = Arc::clone(&self.search);
            let query = query.clone();
            let params = params.clone();
            handles.push(tokio::spawn(
                async move { search.search(&query, &params).await },
            ));
        }

        let mut merged = DocumentSet::new();
        for (query, handle) in queries.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(ScoutError::search(format!("search task failed: {e}"))),
            };

            match outcome {
                Ok(results) => {
                    for item in results {
                        if let Some(doc) = process_search_result(item, query) {
                            merged.insert(doc);
                        }
                    }
                }
                Err(e) => {
                    warn!(query, error = %e, "search failed for query");
                    self.log.append(
                        &state.job_id,
                        ProgressEvent::QueryError {
                            query: query.clone(),
                            error: e.to_string(),
                            category: self.category,
                        },
                    );
                }
            }
        }

        self.log.append(
            &state.job_id,
            ProgressEvent::SearchComplete {
                total_documents: merged.len(),
                queries_processed: queries.len(),
                category: self.category,
            },
        );

        Ok(merged)
    }

    /// Run the full research track: generate queries, search, merge over the
    /// first-party site-scrape seed, and report the documents found.
    #[instrument(skip_all, fields(category = %self.category, company = %state.company))]
    pub async fn run(&self, state: &ResearchState) -> Result<ResearcherOutput> {
        let queries = self.generate_queries(state).await?;

        let mut messages = Vec::new();
        let subqueries = queries
            .iter()
            .map(|q| format!("• {q}"))
            .collect::<Vec<_>>()
            .join("\n");
        messages.push(format!(
            "Subqueries for {} analysis:\n{subqueries}",
            self.category
        ));

        // Seed with first-party scrape data; search results take precedence
        // on URL collision.
        let mut documents = state.site_scrape.clone();
        let found = self.search_documents(state, &queries).await?;
        documents.extend(found);

        let count = documents.len();
        messages.push(format!(
            "{} researcher found {count} documents for {}",
            self.category.label(),
            state.company
        ));

        self.log.append(
            &state.job_id,
            ProgressEvent::AnalysisComplete {
                category: self.category,
                count,
            },
        );

        info!(count, "research track complete");

        Ok(ResearcherOutput {
            category: self.category,
            documents,
            messages,
        })
    }
}

// ---------------------------------------------------------------------------
// Search-result normalization
// ---------------------------------------------------------------------------

static TITLE_JUNK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[*_#`\[\]]+").expect("title junk pattern")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Strip markdown residue and collapse whitespace in a result title.
pub fn clean_title(title: &str) -> String {
    let stripped = TITLE_JUNK.replace_all(title, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Normalize one search result into a document. Results without content or a
/// URL are discarded; titles equal to the URL (or empty) are blanked.
fn process_search_result(result: SearchResult, query: &str) -> Option<Document> {
    if result.content.is_empty() || result.url.is_empty() {
        return None;
    }

    let mut title = clean_title(&result.title);
    if title.eq_ignore_ascii_case(&result.url) {
        title = String::new();
    }

    Some(Document {
        url: result.url,
        title,
        content: result.content,
        raw_content: result.raw_content,
        query: query.to_string(),
        source: DocSource::WebSearch,
        score: result.score,
        doc_type: None,
        evaluation: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use companyscout_shared::JobId;

    struct MockCompletion {
        chunks: Vec<&'static str>,
    }

    impl CompletionProvider for MockCompletion {
        async fn complete(&self, _prompt: &Prompt) -> Result<String> {
            Ok(self.chunks.concat())
        }

        async fn complete_stream(
            &self,
            _prompt: &Prompt,
            tx: mpsc::Sender<String>,
        ) -> Result<String> {
            for chunk in &self.chunks {
                let _ = tx.send(chunk.to_string()).await;
            }
            Ok(self.chunks.concat())
        }
    }

    struct MockSearch {
        results: std::collections::HashMap<String, Vec<SearchResult>>,
        failing: std::collections::HashSet<String>,
    }

    impl MockSearch {
        fn empty() -> Self {
            Self {
                results: Default::default(),
                failing: Default::default(),
            }
        }
    }

    impl SearchProvider for MockSearch {
        async fn search(&self, query: &str, _params: &SearchParams) -> Result<Vec<SearchResult>> {
            if self.failing.contains(query) {
                return Err(ScoutError::search(format!("'{query}': backend exploded")));
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }

    fn result(url: &str, title: &str, content: &str, score: f64) -> SearchResult {
        serde_json::from_value(serde_json::json!({
            "url": url, "title": title, "content": content, "score": score
        }))
        .unwrap()
    }

    fn test_state() -> ResearchState {
        ResearchState::new("Tesla", "Automotive", "Austin, TX", JobId::new())
    }

    fn researcher(
        category: Category,
        completion: MockCompletion,
        search: MockSearch,
        log: ProgressLog,
    ) -> Researcher<MockCompletion, MockSearch> {
        Researcher::new(category, Arc::new(completion), Arc::new(search), log)
    }

    #[tokio::test]
    async fn queries_split_on_newlines_and_cap_at_four() {
        let completion = MockCompletion {
            chunks: vec!["Tesla reve", "nue 2026\nTesla fund", "ing\nTesla valuation\nTesla profit\nTesla extra"],
        };
        let log = ProgressLog::new();
        let state = test_state();
        let r = researcher(Category::Financial, completion, MockSearch::empty(), log.clone());

        let queries = r.generate_queries(&state).await.unwrap();
        assert_eq!(
            queries,
            vec![
                "Tesla revenue 2026",
                "Tesla funding",
                "Tesla valuation",
                "Tesla profit"
            ]
        );

        // The trailing remainder was finalized as a fifth query before the
        // cap, so five query_generated events exist even though only four
        // queries survive.
        let events = log.snapshot(&state.job_id).unwrap().events;
        let generated: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::QueryGenerated { query, .. } => Some(query.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(generated.len(), 5);
        assert_eq!(generated[4], "Tesla extra");

        let complete = events.iter().rev().find_map(|e| match e {
            ProgressEvent::QueriesComplete { count, .. } => Some(*count),
            _ => None,
        });
        assert_eq!(complete, Some(4));
    }

    #[tokio::test]
    async fn remainder_without_newline_becomes_final_query() {
        let completion = MockCompletion {
            chunks: vec!["Tesla news today"],
        };
        let state = test_state();
        let r = researcher(
            Category::News,
            completion,
            MockSearch::empty(),
            ProgressLog::new(),
        );
        let queries = r.generate_queries(&state).await.unwrap();
        assert_eq!(queries, vec!["Tesla news today"]);
    }

    #[tokio::test]
    async fn zero_queries_is_fatal() {
        let completion = MockCompletion {
            chunks: vec!["\n", "  \n"],
        };
        let state = test_state();
        let r = researcher(
            Category::News,
            completion,
            MockSearch::empty(),
            ProgressLog::new(),
        );
        let err = r.generate_queries(&state).await.unwrap_err();
        assert!(matches!(err, ScoutError::Validation { .. }));
    }

    #[tokio::test]
    async fn search_merge_is_last_query_wins() {
        let mut search = MockSearch::empty();
        search.results.insert(
            "q1".into(),
            vec![result("https://a.example/page", "First", "from q1", 0.9)],
        );
        search.results.insert(
            "q2".into(),
            vec![result("https://a.example/page", "Second", "from q2", 0.5)],
        );

        let state = test_state();
        let r = researcher(
            Category::Company,
            MockCompletion { chunks: vec![] },
            search,
            ProgressLog::new(),
        );
        let merged = r
            .search_documents(&state, &["q1".into(), "q2".into()])
            .await
            .unwrap();

        assert_eq!(merged.len(), 1);
        let doc = merged.get("https://a.example/page").unwrap();
        assert_eq!(doc.content, "from q2");
        assert_eq!(doc.query, "q2");
    }

    #[tokio::test]
    async fn one_failing_query_is_isolated() {
        let mut search = MockSearch::empty();
        search.results.insert(
            "good".into(),
            vec![result("https://ok.example/x", "OK", "body", 0.8)],
        );
        search.failing.insert("bad".into());

        let log = ProgressLog::new();
        let state = test_state();
        let r = researcher(
            Category::Industry,
            MockCompletion { chunks: vec![] },
            search,
            log.clone(),
        );
        let merged = r
            .search_documents(&state, &["bad".into(), "good".into()])
            .await
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert!(merged.contains("https://ok.example/x"));

        let events = log.snapshot(&state.job_id).unwrap().events;
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::QueryError { query, .. } if query == "bad"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::SearchComplete { total_documents: 1, queries_processed: 2, .. }
        )));
    }

    #[tokio::test]
    async fn run_seeds_from_site_scrape_and_search_overrides() {
        let mut state = test_state();
        let mut seed = Document::new("https://tesla.example/about", "seeded first-party page");
        seed.source = DocSource::CompanyWebsite;
        state.site_scrape.insert(seed);
        state
            .site_scrape
            .insert(Document::new("https://tesla.example/ir", "investor page"));

        let mut search = MockSearch::empty();
        search.results.insert(
            "Tesla overview".into(),
            vec![result(
                "https://tesla.example/about",
                "About",
                "fresher search copy",
                0.7,
            )],
        );

        let r = researcher(
            Category::Company,
            MockCompletion {
                chunks: vec!["Tesla overview"],
            },
            search,
            ProgressLog::new(),
        );
        let output = r.run(&state).await.unwrap();

        assert_eq!(output.category, Category::Company);
        assert_eq!(output.documents.len(), 2);
        // Search result replaced the seed for the colliding URL.
        assert_eq!(
            output
                .documents
                .get("https://tesla.example/about")
                .unwrap()
                .content,
            "fresher search copy"
        );
        assert!(output.messages.iter().any(|m| m.contains("found 2 documents")));
    }

    #[test]
    fn clean_title_strips_markdown_and_whitespace() {
        assert_eq!(clean_title("  **Tesla**  Q2   Report "), "Tesla Q2 Report");
        assert_eq!(clean_title("[Tesla] `news`"), "Tesla news");
        assert_eq!(clean_title(""), "");
    }

    #[tokio::test]
    async fn result_titled_with_its_own_url_is_blanked() {
        let mut search = MockSearch::empty();
        search.results.insert(
            "q".into(),
            vec![result(
                "https://a.example/x",
                "https://a.example/x",
                "body",
                0.9,
            )],
        );
        let state = test_state();
        let r = researcher(
            Category::News,
            MockCompletion { chunks: vec![] },
            search,
            ProgressLog::new(),
        );
        let merged = r.search_documents(&state, &["q".into()]).await.unwrap();
        assert_eq!(merged.get("https://a.example/x").unwrap().title, "");
    }

    #[tokio::test]
    async fn result_without_content_is_discarded() {
        let mut search = MockSearch::empty();
        search.results.insert(
            "q".into(),
            vec![result("https://a.example/x", "Title", "", 0.9)],
        );
        let state = test_state();
        let r = researcher(
            Category::News,
            MockCompletion { chunks: vec![] },
            search,
            ProgressLog::new(),
        );
        let merged = r.search_documents(&state, &["q".into()]).await.unwrap();
        assert!(merged.is_empty());
    }
}
