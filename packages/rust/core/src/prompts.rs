//! Prompt text for briefing synthesis and report editing.
//!
//! Templates use `{company}`-style placeholders substituted with
//! `str::replace` at call sites.

use companyscout_shared::Category;

// ---------------------------------------------------------------------------
// Briefing prompts
// ---------------------------------------------------------------------------

pub const FINANCIAL_BRIEFING_PROMPT: &str = "\
Write a financial briefing on {company}, a {industry} company headquartered \
in {hq_location}. Cover revenue and growth, funding history and investors, \
profitability, valuation, and recent financial events. Use only the research \
documents provided below.";

pub const NEWS_BRIEFING_PROMPT: &str = "\
Write a news briefing on {company}, a {industry} company headquartered in \
{hq_location}. Summarize recent announcements, product launches, \
partnerships, leadership changes, and other notable coverage. Use only the \
research documents provided below.";

pub const INDUSTRY_BRIEFING_PROMPT: &str = "\
Write an industry briefing for {company}, a {industry} company headquartered \
in {hq_location}. Cover market size and trends, the competitive landscape, \
{company}'s position within it, and regulatory or technology shifts shaping \
the sector. Use only the research documents provided below.";

pub const COMPANY_BRIEFING_PROMPT: &str = "\
Write a company briefing on {company}, a {industry} company headquartered in \
{hq_location}. Cover products and services, business model, leadership, \
history, and operations. Use only the research documents provided below.";

/// Shared instruction appended after the category prompt and before the
/// formatted documents.
pub const BRIEFING_ANALYSIS_INSTRUCTION: &str = "\
Write in clear, factual prose organized under markdown headings. State only \
what the documents support; omit speculation. Do not include a references or \
sources section.";

/// The synthesis prompt for one category's briefing.
pub fn briefing_prompt(category: Category) -> &'static str {
    match category {
        Category::Financial => FINANCIAL_BRIEFING_PROMPT,
        Category::News => NEWS_BRIEFING_PROMPT,
        Category::Industry => INDUSTRY_BRIEFING_PROMPT,
        Category::Company => COMPANY_BRIEFING_PROMPT,
    }
}

// ---------------------------------------------------------------------------
// Editor prompts
// ---------------------------------------------------------------------------

pub const EDITOR_SYSTEM_MESSAGE: &str = "\
You are an expert research editor. You merge sectional briefings into a \
single cohesive research report without losing factual content.";

/// Phase one: merge the category briefings into one cohesive report.
pub const COMPILE_CONTENT_PROMPT: &str = "\
Merge the following briefings into one cohesive research report on \
{company}, a {industry} company headquartered in {hq_location}. Keep every \
distinct fact, remove duplicated statements, and order sections as company \
overview, industry landscape, financials, then recent news. Output markdown \
only.

{combined_content}";

pub const SWEEP_SYSTEM_MESSAGE: &str = "\
You are a precise copy editor. You polish research reports without adding, \
removing, or altering factual claims.";

/// Phase two: redundancy and formatting sweep over the compiled report.
pub const CONTENT_SWEEP_PROMPT: &str = "\
Remove redundancy and polish the formatting of the report below. Preserve \
every factual claim and the References section verbatim. Output the full \
cleaned report in markdown.

{content}";
