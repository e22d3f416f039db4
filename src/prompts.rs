//! Prompts, questions and fixed texts for LLM-based report analysis.
//!
//! Centralising every prompt here keeps the request-building code in
//! [`crate::pipeline::prompt`] free of prose, and lets unit tests inspect the
//! exact wording without calling a model.

/// The ten scorecard questions, in answer order.
///
/// Index `i` corresponds to [`crate::report::Criterion::ALL`]`[i]`.
pub const ANALYSIS_QUESTIONS: [&str; 10] = [
    "Does the report include the publication date?",
    "Does the report identify the author or research organization?",
    "Does the report provide numerical values for the Total Addressable Market (TAM)?",
    "Does the report present a Compound Annual Growth Rate (CAGR) or similar metric for market growth?",
    "Does the report identify distinct customer segments within the market?",
    "Does the report describe the competitive landscape?",
    "Does the report include a section on emerging technologies or innovations disrupting the market?",
    "Does the report discuss industry trends?",
    "Does the report offer a regional or geographic breakdown of the market?",
    "Does the report identify regulatory requirements affecting the market?",
];

/// The five summary headings, in the order they must appear.
pub const SECTION_HEADINGS: [&str; 5] = [
    "EXECUTIVE SUMMARY",
    "MARKET SIZE & GROWTH",
    "MARKET SEGMENTATION",
    "COMPETITIVE LANDSCAPE",
    "EMERGING TRENDS",
];

/// Title prepended to a summary that arrives without one.
pub const SUMMARY_TITLE: &str = "# Market Research Report Summary";

/// Paragraph keywords that mark text as relevant to the summary.
///
/// Matched case-insensitively as substrings; keep entries lowercase.
pub const SECTION_KEYWORDS: &[&str] = &[
    "executive summary",
    "key findings",
    "market size",
    "market value",
    "valued at",
    "revenue",
    "cagr",
    "growth rate",
    "forecast",
    "segmentation",
    "segment",
    "end user",
    "application",
    "region",
    "competitive landscape",
    "key players",
    "market share",
    "competitor",
    "emerging",
    "trend",
    "innovation",
    "technolog",
    "regulatory",
    "regulation",
    "drivers",
    "challenges",
    "opportunit",
];

/// System message for scorecard mode.
pub const SCORECARD_SYSTEM_PROMPT: &str = "You are an expert at analyzing market research reports. \
Answer questions about the provided report with yes or no only. Be conservative in your \
assessment: only answer yes if the information is clearly stated in the report.";

/// System message for summary mode.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a senior market research analyst. You write \
concise, factual summaries of market research reports in markdown. You never add preambles, \
explanations of your process, or commentary about the task.";

/// Build the scorecard user prompt around (already truncated) report text.
pub fn scorecard_prompt(report_text: &str) -> String {
    let questions = ANALYSIS_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert market research analyst. Analyze the following market report text and answer these yes/no questions:

{questions}

Answer ONLY with "yes" or "no" for each question, as a numbered list with exactly one answer per line and nothing else:
1. yes/no
2. yes/no
...and so on up to 10.

Here is the market report text to analyze:
{report_text}
"#
    )
}

/// Build the summary user prompt around (already filtered) report text.
pub fn summary_prompt(report_text: &str) -> String {
    let headings = SECTION_HEADINGS
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{}. ## {}", i + 1, h))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r###"Summarize the market research report below in markdown.

Your output MUST contain exactly these five sections, as level-2 headings, in this order:
{headings}

Rules:
- Start your output directly with "## {first}". Write nothing before it.
- Do NOT include preambles, introductions, notes about your approach, or closing remarks.
- Use bullet points for lists of figures, segments and companies.
- Quote market sizes, growth rates (CAGR) and percentages exactly as stated in the report.
- If the report does not cover a section, write "Not covered in the report." under that heading.

Report text:
{report_text}
"###,
        first = SECTION_HEADINGS[0],
    )
}

/// Completion substituted when the provider rejects a scorecard prompt as
/// too long for the model's context window.
pub const CANNED_SCORECARD_RESPONSE: &str = "1. no
2. no
3. no
4. no
5. no
6. no
7. no
8. no
9. no
10. no";

/// Completion substituted when the provider rejects a summary prompt as
/// too long for the model's context window.
pub const CANNED_SUMMARY_RESPONSE: &str = "## EXECUTIVE SUMMARY
The report is too long to be analysed in a single request. Upload a shorter excerpt (for example the executive summary and key findings) to receive a full summary.

## MARKET SIZE & GROWTH
Not available: the report exceeded the model's context window.

## MARKET SEGMENTATION
Not available: the report exceeded the model's context window.

## COMPETITIVE LANDSCAPE
Not available: the report exceeded the model's context window.

## EMERGING TRENDS
Not available: the report exceeded the model's context window.";
