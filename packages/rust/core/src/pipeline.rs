//! End-to-end research pipeline.
//!
//! Runs the four category researchers in parallel, merges their output into
//! the shared state, then drives the sequential stages: collection check,
//! curation, briefing synthesis, and report editing.

use std::sync::Arc;

use tracing::{info, instrument};

use companyscout_providers::{CompletionProvider, SearchProvider};
use companyscout_research::{Researcher, collector};
use companyscout_shared::{
    Category, DefaultsConfig, JobId, ProgressEvent, ProgressLog, ResearchState, Result,
    ScoutError,
};

use crate::briefing::Briefing;
use crate::curator::Curator;
use crate::editor::Editor;

/// Inputs for one research run.
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub company: String,
    pub company_url: Option<String>,
    pub industry: Option<String>,
    pub hq_location: Option<String>,
    pub job_id: Option<JobId>,
}

impl ResearchRequest {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            company_url: None,
            industry: None,
            hq_location: None,
            job_id: None,
        }
    }
}

/// Run the full pipeline and return the finished state.
///
/// The job is registered in the progress log up front and its status is set
/// to `completed` or `failed` at the end, so pollers always see a terminal
/// status. Errors from any stage propagate after the status update.
#[instrument(skip_all, fields(company = %request.company))]
pub async fn run_research<C: CompletionProvider, S: SearchProvider>(
    request: ResearchRequest,
    defaults: &DefaultsConfig,
    completion: Arc<C>,
    search: Arc<S>,
    log: ProgressLog,
) -> Result<ResearchState> {
    let job_id = request.job_id.clone().unwrap_or_default();
    let mut state = ResearchState::new(
        &request.company,
        request.industry.as_deref().unwrap_or("Unknown"),
        request.hq_location.as_deref().unwrap_or("Unknown"),
        job_id.clone(),
    );
    state.company_url = request.company_url.clone();
    log.register(&job_id, &state.company);

    match run_stages(&mut state, defaults, completion, search, &log).await {
        Ok(()) => {
            log.set_status(&job_id, "completed");
            info!(%job_id, "research run completed");
            Ok(state)
        }
        Err(e) => {
            log.set_status(&job_id, "failed");
            log.append(
                &job_id,
                ProgressEvent::Error {
                    error: e.to_string(),
                    category: None,
                    step: None,
                },
            );
            Err(e)
        }
    }
}

async fn run_stages<C: CompletionProvider, S: SearchProvider>(
    state: &mut ResearchState,
    defaults: &DefaultsConfig,
    completion: Arc<C>,
    search: Arc<S>,
    log: &ProgressLog,
) -> Result<()> {
    // Four researchers run in parallel against a snapshot of the state;
    // their outputs merge back sequentially in category order.
    let mut handles = Vec::new();
    for category in Category::ALL {
        let researcher = Researcher::new(
            category,
            Arc::clone(&completion),
            Arc::clone(&search),
            log.clone(),
        )
        .with_max_queries(defaults.max_queries);
        let snapshot = state.clone();
        handles.push((
            category,
            tokio::spawn(async move { researcher.run(&snapshot).await }),
        ));
    }
    for (category, handle) in handles {
        let output = handle
            .await
            .map_err(|e| ScoutError::completion(format!("{category} researcher task: {e}")))??;
        for message in output.messages {
            state.push_message(message);
        }
        *state.data.get_mut(output.category) = output.documents;
    }

    collector::collect(state);

    Curator::from_defaults(defaults).curate(state, log);

    Briefing::new(Arc::clone(&completion))
        .with_concurrency(defaults.briefing_concurrency)
        .create_briefings(state, log)
        .await?;

    Editor::new(completion).compile_briefings(state, log).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use companyscout_providers::{Prompt, SearchParams, SearchResult};

    /// Dispatches on prompt text: query generation streams two queries,
    /// briefings and the compile step return prose, the sweep streams a
    /// polished report.
    struct ScriptedCompletion;

    impl CompletionProvider for ScriptedCompletion {
        async fn complete(&self, prompt: &Prompt) -> Result<String> {
            if prompt.user.contains("briefing on") || prompt.user.contains("briefing for") {
                Ok("Synthesized briefing prose.".into())
            } else if prompt.user.contains("Merge the following briefings") {
                Ok("Compiled report body.".into())
            } else {
                Err(ScoutError::completion("unexpected blocking prompt"))
            }
        }

        async fn complete_stream(
            &self,
            prompt: &Prompt,
            tx: mpsc::Sender<String>,
        ) -> Result<String> {
            let text = if prompt.user.contains("Generate search queries") {
                "Acme revenue 2026\nAcme funding history\n"
            } else if prompt.user.contains("Remove redundancy") {
                "Polished final report. Nothing lost."
            } else {
                return Err(ScoutError::completion("unexpected streaming prompt"));
            };
            for piece in text.split_inclusive(' ') {
                let _ = tx.send(piece.to_string()).await;
            }
            Ok(text.to_string())
        }
    }

    /// Returns one scored document per query.
    struct ScriptedSearch;

    impl SearchProvider for ScriptedSearch {
        async fn search(&self, query: &str, _params: &SearchParams) -> Result<Vec<SearchResult>> {
            let slug: String = query
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { '-' })
                .collect();
            Ok(vec![SearchResult {
                url: format!("https://results.example/{slug}"),
                title: format!("Result for {query}"),
                content: format!("Findings for {query}."),
                raw_content: None,
                score: Some(0.8),
            }])
        }
    }

    #[tokio::test]
    async fn full_run_produces_report_briefings_and_terminal_status() {
        let log = ProgressLog::new();
        let request = ResearchRequest {
            company: "Acme".into(),
            company_url: Some("https://acme.example".into()),
            industry: Some("Robotics".into()),
            hq_location: Some("Berlin".into()),
            job_id: None,
        };

        let state = run_research(
            request,
            &DefaultsConfig::default(),
            Arc::new(ScriptedCompletion),
            Arc::new(ScriptedSearch),
            log.clone(),
        )
        .await
        .unwrap();

        // Every category got data, curation kept the 0.8-scored documents,
        // and each curated category produced a briefing.
        for category in Category::ALL {
            assert!(!state.data.get(category).is_empty());
            assert!(!state.curated.get(category).is_empty());
            assert!(!state.briefing.get(category).is_empty());
        }
        assert_eq!(state.briefings.len(), 4);
        assert!(!state.references.is_empty());

        assert_eq!(state.report, "Polished final report. Nothing lost.");
        assert_eq!(state.status, "editor_complete");

        let status = log.snapshot(&state.job_id).unwrap();
        assert_eq!(status.status, "completed");
        assert_eq!(status.company, "Acme");
        assert!(status
            .events
            .iter()
            .any(|e| matches!(e, ProgressEvent::ReportChunk { .. })));
        assert!(status
            .events
            .iter()
            .any(|e| matches!(e, ProgressEvent::QueriesComplete { .. })));
    }

    #[tokio::test]
    async fn defaults_apply_when_request_fields_are_missing() {
        let log = ProgressLog::new();
        let state = run_research(
            ResearchRequest::new("Acme"),
            &DefaultsConfig::default(),
            Arc::new(ScriptedCompletion),
            Arc::new(ScriptedSearch),
            log,
        )
        .await
        .unwrap();

        assert_eq!(state.industry, "Unknown");
        assert_eq!(state.hq_location, "Unknown");
        assert!(state.company_url.is_none());
    }

    /// Query generation failing for every category fails the run and marks
    /// the job failed.
    struct FailingCompletion;

    impl CompletionProvider for FailingCompletion {
        async fn complete(&self, _prompt: &Prompt) -> Result<String> {
            Err(ScoutError::completion("service down"))
        }

        async fn complete_stream(
            &self,
            _prompt: &Prompt,
            _tx: mpsc::Sender<String>,
        ) -> Result<String> {
            Err(ScoutError::completion("service down"))
        }
    }

    #[tokio::test]
    async fn stage_failure_marks_the_job_failed() {
        let log = ProgressLog::new();
        let request = {
            let mut r = ResearchRequest::new("Acme");
            r.job_id = Some(JobId::new());
            r
        };
        let job_id = request.job_id.clone().unwrap();

        let result = run_research(
            request,
            &DefaultsConfig::default(),
            Arc::new(FailingCompletion),
            Arc::new(ScriptedSearch),
            log.clone(),
        )
        .await;

        assert!(result.is_err());
        let status = log.snapshot(&job_id).unwrap();
        assert_eq!(status.status, "failed");
        assert!(status
            .events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Error { .. })));
    }
}
