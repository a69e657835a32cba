//! Collection checkpoint between the researchers and the curator.
//!
//! Verifies which category result sets are present and records a
//! human-readable summary. Never mutates or drops research data.

use tracing::info;

use companyscout_shared::{Category, ResearchState};

/// Check presence and volume of each category's research data and append a
/// summary message to the state.
pub fn collect(state: &mut ResearchState) {
    let mut msg = vec![format!("Collecting research data for {}:", state.company)];

    for category in Category::ALL {
        let data = state.data.get(category);
        if data.is_empty() {
            msg.push(format!("• {}: No data found", category.label()));
        } else {
            msg.push(format!(
                "• {}: {} documents collected",
                category.label(),
                data.len()
            ));
        }
    }

    info!(company = %state.company, "collection check complete");
    state.push_message(msg.join("\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use companyscout_shared::{Document, JobId};

    #[test]
    fn collect_reports_presence_and_volume() {
        let mut state = ResearchState::new("Tesla", "Automotive", "Austin, TX", JobId::new());
        state
            .data
            .get_mut(Category::Financial)
            .insert(Document::new("https://a.example/1", "x"));
        state
            .data
            .get_mut(Category::Financial)
            .insert(Document::new("https://a.example/2", "y"));

        collect(&mut state);

        let msg = state.messages.last().unwrap();
        assert!(msg.contains("Financial: 2 documents collected"));
        assert!(msg.contains("News: No data found"));
        assert!(msg.contains("Industry: No data found"));
        assert!(msg.contains("Company: No data found"));

        // Data untouched.
        assert_eq!(state.data.get(Category::Financial).len(), 2);
    }
}
