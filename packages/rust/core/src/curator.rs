//! Curation stage: dedup, relevance filtering, ranking, and capping.
//!
//! The curator walks each category's raw research data, dedups on normalized
//! URL (first occurrence wins), applies the relevance threshold with a
//! first-party exemption, ranks by score, caps the survivors, and finally
//! selects the bounded reference list for the report.

use std::cmp::Ordering;

use tracing::{debug, info, warn};
use url::Url;

use companyscout_shared::{
    Category, DefaultsConfig, DocSource, Document, DocumentSet, Evaluation, ProgressEvent,
    ProgressLog, ResearchState,
};

use crate::references;

/// Canonicalize a URL for identity comparison: default to https when no
/// scheme is present, drop the query string and fragment. Returns `None`
/// for strings that cannot be parsed as a URL at all.
///
/// Idempotent: normalizing an already-normalized URL is a no-op.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let mut url = Url::parse(&candidate).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Relevance filtering and ranking policy.
#[derive(Debug, Clone)]
pub struct Curator {
    /// Minimum score a non-first-party document must meet.
    pub relevance_threshold: f64,
    /// Curated documents kept per category after ranking.
    pub max_docs_per_category: usize,
    /// References listed in the final report.
    pub max_references: usize,
}

impl Default for Curator {
    fn default() -> Self {
        Self::from_defaults(&DefaultsConfig::default())
    }
}

impl Curator {
    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            relevance_threshold: defaults.relevance_threshold,
            max_docs_per_category: defaults.max_docs_per_category,
            max_references: defaults.max_references,
        }
    }

    /// Score each document against the threshold and rank survivors.
    ///
    /// A missing or unparsable score coerces to 0.0, so malformed documents
    /// drop via the threshold. First-party documents (company website) are
    /// exempt and always kept. Survivors get an [`Evaluation`] attached and
    /// come back sorted by score, highest first (stable for ties).
    pub fn evaluate_documents(&self, docs: Vec<Document>, company: &str) -> Vec<Document> {
        let mut evaluated: Vec<Document> = Vec::with_capacity(docs.len());

        for mut doc in docs {
            let score = doc.score.unwrap_or(0.0);
            let first_party = doc.source == DocSource::CompanyWebsite;

            if score >= self.relevance_threshold || first_party {
                doc.evaluation = Some(Evaluation {
                    overall_score: score,
                    query: doc.query.clone(),
                });
                evaluated.push(doc);
            } else {
                debug!(
                    company,
                    url = %doc.url,
                    score,
                    "document below relevance threshold, dropped"
                );
            }
        }

        evaluated.sort_by(|a, b| {
            b.overall_score()
                .partial_cmp(&a.overall_score())
                .unwrap_or(Ordering::Equal)
        });
        evaluated
    }

    /// Curate every category's research data and select references.
    ///
    /// Categories with no data are skipped; a category whose documents all
    /// fall below the threshold contributes an empty curated list but never
    /// fails the run.
    pub fn curate(&self, state: &mut ResearchState, log: &ProgressLog) {
        let mut msg = vec![format!("Curating research data for {}:", state.company)];

        for category in Category::ALL {
            let data = state.data.get(category);
            if data.is_empty() {
                continue;
            }

            // First-wins dedup on normalized URL, walking insertion order.
            let mut unique = DocumentSet::new();
            for doc in data.iter() {
                let Some(clean_url) = normalize_url(&doc.url) else {
                    warn!(url = %doc.url, "unparsable document URL, dropped");
                    continue;
                };
                if unique.contains(&clean_url) {
                    continue;
                }
                let mut doc = doc.clone();
                doc.url = clean_url;
                doc.doc_type = Some(category);
                unique.insert(doc);
            }

            msg.push(format!(
                "• {}: Found {} documents",
                category.label(),
                unique.len()
            ));

            let evaluated =
                self.evaluate_documents(unique.into_iter().collect(), &state.company);

            log.append(
                &state.job_id,
                ProgressEvent::Curation {
                    category,
                    total: evaluated.len(),
                    message: format!("Curating {} documents", category.as_str()),
                },
            );

            if evaluated.is_empty() {
                msg.push("  → No relevant documents found".into());
                continue;
            }

            let mut kept = evaluated;
            kept.truncate(self.max_docs_per_category);
            msg.push(format!("  → Kept {} relevant documents", kept.len()));

            info!(
                category = %category,
                kept = kept.len(),
                "category curated"
            );
            *state.curated.get_mut(category) = kept;
        }

        let (urls, titles, info) = references::select_references(state, self.max_references);
        if !urls.is_empty() {
            msg.push(format!("\nSelected {} top references", urls.len()));
        }
        state.references = urls;
        state.reference_titles = titles;
        state.reference_info = info;

        state.push_message(msg.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use companyscout_shared::JobId;

    fn doc(url: &str, score: Option<f64>, source: DocSource) -> Document {
        let mut d = Document::new(url, format!("content for {url}"));
        d.title = format!("Title {url}");
        d.query = "test query".into();
        d.score = score;
        d.source = source;
        d
    }

    #[test]
    fn normalize_url_adds_scheme_and_strips_query_fragment() {
        assert_eq!(
            normalize_url("tesla.com/ir?utm=x#top").as_deref(),
            Some("https://tesla.com/ir")
        );
        assert_eq!(
            normalize_url("http://example.com/a?b=1").as_deref(),
            Some("http://example.com/a")
        );
        assert!(normalize_url("").is_none());
    }

    #[test]
    fn normalize_url_is_idempotent() {
        let once = normalize_url("Example.com/Path?q=1#frag").unwrap();
        let twice = normalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn threshold_drops_low_scores_but_exempts_first_party() {
        let curator = Curator::default();
        let docs = vec![
            doc("https://a.example/low", Some(0.1), DocSource::WebSearch),
            doc("https://a.example/edge", Some(0.4), DocSource::WebSearch),
            doc("https://tesla.com/ir", Some(0.05), DocSource::CompanyWebsite),
            doc("https://a.example/malformed", None, DocSource::WebSearch),
        ];

        let kept = curator.evaluate_documents(docs, "Tesla");
        let urls: Vec<_> = kept.iter().map(|d| d.url.as_str()).collect();

        // 0.4 meets the threshold exactly, first-party is exempt, the rest drop.
        assert_eq!(urls, vec!["https://a.example/edge", "https://tesla.com/ir"]);
        assert!(kept.iter().all(|d| d.evaluation.is_some()));
        assert_eq!(kept[1].overall_score(), 0.05);
    }

    #[test]
    fn evaluation_records_score_and_query() {
        let curator = Curator::default();
        let mut d = doc("https://a.example/x", Some(0.9), DocSource::WebSearch);
        d.query = "Tesla revenue 2025".into();

        let kept = curator.evaluate_documents(vec![d], "Tesla");
        let eval = kept[0].evaluation.as_ref().unwrap();
        assert_eq!(eval.overall_score, 0.9);
        assert_eq!(eval.query, "Tesla revenue 2025");
    }

    #[test]
    fn curate_dedups_first_wins_on_normalized_url() {
        let curator = Curator::default();
        let mut state = ResearchState::new("Tesla", "Automotive", "Austin, TX", JobId::new());
        let log = ProgressLog::new();

        let financial = state.data.get_mut(Category::Financial);
        financial.insert(doc(
            "https://a.example/page?utm=1",
            Some(0.5),
            DocSource::WebSearch,
        ));
        financial.insert(doc(
            "https://a.example/page#section",
            Some(0.9),
            DocSource::WebSearch,
        ));

        curator.curate(&mut state, &log);

        let kept = state.curated.get(Category::Financial);
        assert_eq!(kept.len(), 1);
        // First occurrence wins, URL rewritten to the normalized form.
        assert_eq!(kept[0].url, "https://a.example/page");
        assert_eq!(kept[0].overall_score(), 0.5);
        assert_eq!(kept[0].doc_type, Some(Category::Financial));
    }

    #[test]
    fn curate_caps_and_ranks_descending() {
        let curator = Curator::default();
        let mut state = ResearchState::new("Tesla", "Automotive", "Austin, TX", JobId::new());
        let log = ProgressLog::new();

        for i in 0..40 {
            state.data.get_mut(Category::News).insert(doc(
                &format!("https://news.example/{i}"),
                Some(0.4 + (i as f64) * 0.01),
                DocSource::WebSearch,
            ));
        }

        curator.curate(&mut state, &log);

        let kept = state.curated.get(Category::News);
        assert_eq!(kept.len(), 30);
        for pair in kept.windows(2) {
            assert!(pair[0].overall_score() >= pair[1].overall_score());
        }
        // The cap keeps the highest-scored documents.
        assert_eq!(kept[0].url, "https://news.example/39");
    }

    #[test]
    fn curation_event_carries_pre_cap_total() {
        let curator = Curator {
            max_docs_per_category: 2,
            ..Curator::default()
        };
        let mut state = ResearchState::new("Tesla", "Automotive", "Austin, TX", JobId::new());
        let log = ProgressLog::new();

        for i in 0..5 {
            state.data.get_mut(Category::Company).insert(doc(
                &format!("https://tesla.com/{i}"),
                Some(0.8),
                DocSource::WebSearch,
            ));
        }

        curator.curate(&mut state, &log);

        let status = log.snapshot(&state.job_id).unwrap();
        let total = status
            .events
            .iter()
            .find_map(|e| match e {
                ProgressEvent::Curation { category, total, .. }
                    if *category == Category::Company =>
                {
                    Some(*total)
                }
                _ => None,
            })
            .expect("curation event");
        assert_eq!(total, 5);
        assert_eq!(state.curated.get(Category::Company).len(), 2);
    }

    #[test]
    fn empty_categories_are_skipped() {
        let curator = Curator::default();
        let mut state = ResearchState::new("Tesla", "Automotive", "Austin, TX", JobId::new());
        let log = ProgressLog::new();

        curator.curate(&mut state, &log);

        assert_eq!(log.event_count(&state.job_id), 0);
        let msg = state.messages.last().unwrap();
        assert!(msg.starts_with("Curating research data for Tesla"));
        assert!(!msg.contains("Found"));
    }

    #[test]
    fn all_below_threshold_leaves_category_empty_without_failing() {
        let curator = Curator::default();
        let mut state = ResearchState::new("Tesla", "Automotive", "Austin, TX", JobId::new());
        let log = ProgressLog::new();

        state.data.get_mut(Category::Industry).insert(doc(
            "https://a.example/weak",
            Some(0.1),
            DocSource::WebSearch,
        ));

        curator.curate(&mut state, &log);

        assert!(state.curated.get(Category::Industry).is_empty());
        let msg = state.messages.last().unwrap();
        assert!(msg.contains("No relevant documents found"));
    }
}
