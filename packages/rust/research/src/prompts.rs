//! Query-generation prompt text for the four research tracks.

/// Shared formatting rules appended to every query prompt. The streaming
/// parser relies on one query per line.
pub const QUERY_FORMAT_GUIDELINES: &str = "\
Write each search query on its own line, with no numbering, bullets, or \
quotation marks. Each query must mention {company} explicitly. Produce at \
most 4 queries.";

pub const FINANCIAL_QUERY_PROMPT: &str = "\
Generate search queries to research {company}'s financial position: revenue \
and growth, funding rounds and investors, profitability, valuation, and any \
recent financial filings or analyst coverage.";

pub const NEWS_QUERY_PROMPT: &str = "\
Generate search queries to find recent news about {company}: announcements, \
product launches, partnerships, leadership changes, and notable coverage \
from the past year.";

pub const INDUSTRY_QUERY_PROMPT: &str = "\
Generate search queries to research the industry {company} operates in: \
market size and trends, main competitors, {company}'s competitive position, \
and regulatory or technology shifts affecting the sector.";

pub const COMPANY_QUERY_PROMPT: &str = "\
Generate search queries to research {company} itself: products and services, \
business model, leadership team, company history, and headquarters \
operations.";

use companyscout_shared::Category;

/// The task prompt for one category's query generation.
pub fn query_prompt(category: Category) -> &'static str {
    match category {
        Category::Financial => FINANCIAL_QUERY_PROMPT,
        Category::News => NEWS_QUERY_PROMPT,
        Category::Industry => INDUSTRY_QUERY_PROMPT,
        Category::Company => COMPANY_QUERY_PROMPT,
    }
}
