//! Briefing synthesis: one prose briefing per curated category.
//!
//! Non-empty categories run as spawned tasks behind a semaphore; results are
//! awaited in category order and written into the state as they complete.
//! Any briefing failure fails the whole stage (fail fast) — categories
//! awaited after the failure point are never written.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use companyscout_providers::{CompletionProvider, Prompt};
use companyscout_shared::{
    Category, DefaultsConfig, Document, JobId, ProgressEvent, ProgressLog, ResearchState, Result,
    ScoutError,
};

use crate::prompts;

/// Longest document body included in a briefing payload, in bytes.
const MAX_DOC_LENGTH: usize = 8_000;

/// Ceiling on the total formatted payload sent to the completion service.
const MAX_PAYLOAD: usize = 120_000;

/// Company context substituted into the briefing prompts.
#[derive(Debug, Clone)]
struct BriefingContext {
    company: String,
    industry: String,
    hq_location: String,
}

/// Per-category briefing generator.
pub struct Briefing<C> {
    completion: Arc<C>,
    concurrency: usize,
}

impl<C> Clone for Briefing<C> {
    fn clone(&self) -> Self {
        Self {
            completion: Arc::clone(&self.completion),
            concurrency: self.concurrency,
        }
    }
}

// Cut at a char boundary at or below `max` bytes.
fn truncate_at(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

impl<C: CompletionProvider> Briefing<C> {
    pub fn new(completion: Arc<C>) -> Self {
        Self {
            completion,
            concurrency: DefaultsConfig::default().briefing_concurrency,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Format curated documents into the briefing payload.
    ///
    /// Documents go in by score, highest first. Raw page content is
    /// preferred over the search snippet, each body is truncated at
    /// [`MAX_DOC_LENGTH`], and formatting stops before the payload would
    /// exceed [`MAX_PAYLOAD`]. Entries are separated by dashed lines.
    fn prepare_documents(&self, docs: &[Document]) -> String {
        let mut sorted: Vec<&Document> = docs.iter().collect();
        sorted.sort_by(|a, b| {
            b.overall_score()
                .partial_cmp(&a.overall_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut entries = Vec::new();
        let mut total = 0usize;
        for doc in sorted {
            let body = doc.raw_content.as_deref().unwrap_or(&doc.content);
            let body = if body.len() > MAX_DOC_LENGTH {
                format!("{}... [content truncated]", truncate_at(body, MAX_DOC_LENGTH))
            } else {
                body.to_string()
            };
            let entry = format!("Title: {}\n\nContent: {}", doc.title, body);
            if total + entry.len() >= MAX_PAYLOAD {
                warn!(included = entries.len(), "payload ceiling reached");
                break;
            }
            total += entry.len();
            entries.push(entry);
        }

        let separator = format!("\n{}\n", "-".repeat(40));
        format!("{separator}{}{separator}", entries.join(&separator))
    }

    /// Synthesize one category's briefing with a single blocking completion.
    #[instrument(skip_all, fields(category = %category))]
    async fn generate_category_briefing(
        &self,
        docs: &[Document],
        category: Category,
        context: &BriefingContext,
        job_id: &JobId,
        log: &ProgressLog,
    ) -> Result<String> {
        log.append(
            job_id,
            ProgressEvent::BriefingStart {
                category,
                total_docs: docs.len(),
            },
        );

        let task = prompts::briefing_prompt(category)
            .replace("{company}", &context.company)
            .replace("{industry}", &context.industry)
            .replace("{hq_location}", &context.hq_location);
        let payload = self.prepare_documents(docs);
        let prompt = Prompt::user(format!(
            "{task}\n\n{}\n\n{payload}",
            prompts::BRIEFING_ANALYSIS_INSTRUCTION
        ));

        let content = self
            .completion
            .complete(&prompt)
            .await
            .map_err(|e| ScoutError::completion(format!("{category} briefing failed: {e}")))?;
        let content = content.trim();

        if content.is_empty() {
            log.append(
                job_id,
                ProgressEvent::Error {
                    error: "completion service returned empty briefing".into(),
                    category: Some(category),
                    step: Some("Briefing".into()),
                },
            );
            return Err(ScoutError::empty_completion(format!("{category} briefing")));
        }

        log.append(
            job_id,
            ProgressEvent::BriefingComplete {
                category,
                content_length: content.len(),
            },
        );
        info!(length = content.len(), "briefing complete");
        Ok(content.to_string())
    }

    /// Generate briefings for every category with curated documents.
    ///
    /// Empty categories get an empty briefing string up front. Non-empty
    /// ones run concurrently, bounded by the semaphore, and are awaited in
    /// category order; successful briefings are written into the state as
    /// they are joined, and the first failure aborts the stage.
    pub async fn create_briefings(
        &self,
        state: &mut ResearchState,
        log: &ProgressLog,
    ) -> Result<()> {
        let context = BriefingContext {
            company: state.company.clone(),
            industry: state.industry.clone(),
            hq_location: state.hq_location.clone(),
        };
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::new();

        for category in Category::ALL {
            let docs = state.curated.get(category).clone();
            if docs.is_empty() {
                *state.briefing.get_mut(category) = String::new();
                continue;
            }

            let worker = self.clone();
            let ctx = context.clone();
            let job_id = state.job_id.clone();
            let log = log.clone();
            let permit = Arc::clone(&semaphore);
            tasks.push((
                category,
                tokio::spawn(async move {
                    let _permit = permit.acquire_owned().await.expect("semaphore closed");
                    worker
                        .generate_category_briefing(&docs, category, &ctx, &job_id, &log)
                        .await
                }),
            ));
        }

        for (category, handle) in tasks {
            let content = handle
                .await
                .map_err(|e| ScoutError::completion(format!("{category} briefing task: {e}")))??;
            *state.briefing.get_mut(category) = content.clone();
            state.briefings.insert(category, content);
        }

        state.push_message(format!(
            "Generated briefings for {} categories",
            state.briefings.len()
        ));
        Ok(())
    }
}
