//! Report editing: compile the category briefings into one report, then
//! sweep it for redundancy while streaming sentence-boundary chunks to the
//! progress log.
//!
//! Every failure past the compile step degrades instead of aborting: a
//! failed sweep falls back to the compiled text, and an empty final report
//! is logged rather than raised.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use companyscout_providers::{CompletionProvider, Prompt};
use companyscout_shared::{
    Category, JobId, ProgressEvent, ProgressLog, ResearchState, Result,
};

use crate::{prompts, references};

/// A chunk is emitted once the buffer holds a sentence terminator and has
/// grown past this many bytes.
const CHUNK_MIN_LEN: usize = 10;

fn has_sentence_terminal(buffer: &str) -> bool {
    buffer.contains(['.', '!', '?', '\n'])
}

/// Compiles and polishes the final report.
pub struct Editor<C> {
    completion: Arc<C>,
}

impl<C: CompletionProvider> Editor<C> {
    pub fn new(completion: Arc<C>) -> Self {
        Self { completion }
    }

    /// Compile the final report from the per-category briefings.
    ///
    /// Briefings are gathered in compile order (company, industry,
    /// financial, news). With nothing to compile the stage records the
    /// problem and returns without failing the run.
    #[instrument(skip_all, fields(company = %state.company))]
    pub async fn compile_briefings(
        &self,
        state: &mut ResearchState,
        log: &ProgressLog,
    ) -> Result<()> {
        log.append(
            &state.job_id,
            ProgressEvent::ReportCompilation {
                message: format!("Compiling final report for {}", state.company),
            },
        );
        let mut msg = vec![format!("Compiling final report for {}...", state.company)];

        let mut sections: Vec<String> = Vec::new();
        for category in Category::COMPILE_ORDER {
            let content = state.briefing.get(category);
            if content.is_empty() {
                msg.push(format!("No {} briefing available", category.as_str()));
            } else {
                sections.push(content.clone());
                msg.push(format!("Found {} briefing", category.as_str()));
            }
        }

        if sections.is_empty() {
            error!("no briefing sections available to compile");
            msg.push("No briefing sections available to compile".into());
        } else {
            let report = self.edit_report(state, &sections, log).await;
            if report.is_empty() {
                error!("report compilation produced no content");
            } else {
                msg.push(format!("Final report compiled ({} bytes)", report.len()));
            }
        }

        state.push_message(msg.join("\n"));
        Ok(())
    }

    /// Two-phase edit. Writes the report into the state on success and
    /// returns it; returns an empty string when both phases produce nothing.
    async fn edit_report(
        &self,
        state: &mut ResearchState,
        sections: &[String],
        log: &ProgressLog,
    ) -> String {
        let compiled = self.compile_content(state, sections).await;
        if compiled.is_empty() {
            return String::new();
        }

        let swept = self.content_sweep(&compiled, &state.job_id, log).await;
        let report = if swept.is_empty() { compiled } else { swept };
        if report.trim().is_empty() {
            return String::new();
        }

        state.report = report.clone();
        state.editor.report = report.clone();
        state.status = "editor_complete".into();
        info!(length = report.len(), "report ready");
        report
    }

    /// Phase one: merge the sections through one blocking completion and
    /// append the references section. Falls back to the plain concatenation,
    /// without references, if the completion fails.
    async fn compile_content(&self, state: &ResearchState, sections: &[String]) -> String {
        let combined = sections.join("\n\n");
        let prompt = Prompt::user(
            prompts::COMPILE_CONTENT_PROMPT
                .replace("{company}", &state.company)
                .replace("{industry}", &state.industry)
                .replace("{hq_location}", &state.hq_location)
                .replace("{combined_content}", &combined),
        )
        .with_system(prompts::EDITOR_SYSTEM_MESSAGE);

        let report = match self.completion.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "report compile failed, using raw sections");
                return combined;
            }
        };

        if state.references.is_empty() {
            report
        } else {
            let refs =
                references::format_references_section(&state.references, &state.reference_titles);
            format!("{report}\n\n{refs}")
        }
    }

    /// Phase two: stream a redundancy sweep over the compiled report,
    /// emitting sentence-boundary chunks as progress events. Falls back to
    /// the compiled text if the stream fails; partial buffered text from a
    /// failed stream is discarded.
    async fn content_sweep(&self, compiled: &str, job_id: &JobId, log: &ProgressLog) -> String {
        let prompt = Prompt::user(prompts::CONTENT_SWEEP_PROMPT.replace("{content}", compiled))
            .with_system(prompts::SWEEP_SYSTEM_MESSAGE);

        let (tx, mut rx) = mpsc::channel::<String>(64);
        let completion = Arc::clone(&self.completion);
        let task = tokio::spawn(async move { completion.complete_stream(&prompt, tx).await });

        let mut buffer = String::new();
        while let Some(delta) = rx.recv().await {
            buffer.push_str(&delta);
            if has_sentence_terminal(&buffer) && buffer.len() > CHUNK_MIN_LEN {
                log.append(
                    job_id,
                    ProgressEvent::ReportChunk {
                        chunk: std::mem::take(&mut buffer),
                    },
                );
            }
        }

        match task.await {
            Ok(Ok(full)) => {
                if !buffer.is_empty() {
                    log.append(job_id, ProgressEvent::ReportChunk { chunk: buffer });
                }
                full.trim().to_string()
            }
            Ok(Err(e)) => {
                error!(error = %e, "content sweep failed, keeping compiled report");
                log.append(
                    job_id,
                    ProgressEvent::Error {
                        error: e.to_string(),
                        category: None,
                        step: Some("Editor".into()),
                    },
                );
                compiled.to_string()
            }
            Err(e) => {
                error!(error = %e, "content sweep task failed, keeping compiled report");
                log.append(
                    job_id,
                    ProgressEvent::Error {
                        error: e.to_string(),
                        category: None,
                        step: Some("Editor".into()),
                    },
                );
                compiled.to_string()
            }
        }
    }
}
