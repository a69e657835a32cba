//! Reference selection and formatting for the final report.

use std::cmp::Ordering;
use std::collections::HashMap;

use companyscout_shared::{Category, DocSource, Document, ReferenceInfo, ResearchState};

/// Select the top reference URLs across all curated categories.
///
/// Ranking puts first-party documents (company website) ahead of everything
/// else, then orders by evaluation score descending with URL as the
/// tie-break, so selection is deterministic. URLs are unique across
/// categories; at most `max_references` survive.
///
/// Returns the ordered URL list plus URL-keyed title and score/category maps
/// that stay consistent with it.
pub fn select_references(
    state: &ResearchState,
    max_references: usize,
) -> (
    Vec<String>,
    HashMap<String, String>,
    HashMap<String, ReferenceInfo>,
) {
    let mut candidates: Vec<&Document> = Category::ALL
        .iter()
        .flat_map(|&category| state.curated.get(category).iter())
        .collect();

    candidates.sort_by(|a, b| {
        let a_first_party = a.source == DocSource::CompanyWebsite;
        let b_first_party = b.source == DocSource::CompanyWebsite;
        b_first_party
            .cmp(&a_first_party)
            .then_with(|| {
                b.overall_score()
                    .partial_cmp(&a.overall_score())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.url.cmp(&b.url))
    });

    let mut urls = Vec::new();
    let mut titles = HashMap::new();
    let mut info = HashMap::new();

    for doc in candidates {
        if urls.len() >= max_references {
            break;
        }
        if info.contains_key(&doc.url) {
            continue;
        }
        urls.push(doc.url.clone());
        if !doc.title.is_empty() {
            titles.insert(doc.url.clone(), doc.title.clone());
        }
        info.insert(
            doc.url.clone(),
            ReferenceInfo {
                score: doc.overall_score(),
                doc_type: doc.doc_type.unwrap_or(Category::Company),
            },
        );
    }

    (urls, titles, info)
}

/// Render the `## References` markdown section appended to the report.
pub fn format_references_section(
    urls: &[String],
    titles: &HashMap<String, String>,
) -> String {
    let mut out = String::from("## References\n");
    for url in urls {
        match titles.get(url) {
            Some(title) => out.push_str(&format!("- [{title}]({url})\n")),
            None => out.push_str(&format!("- {url}\n")),
        }
    }
    out.trim_end().to_string()
}
