//! Post-processing: deterministic cleanup of LLM-generated summaries.
//!
//! Even a well-prompted model drifts from the five-section contract: reasoning
//! models emit `<think>` blocks, chatty ones open with "Sure! Here is…", and
//! headings come back as `**EXECUTIVE SUMMARY**` or `1. MARKET SEGMENTATION:`.
//! The rules below repair that without touching the content itself.
//!
//! ## Rule Order
//!
//! Reasoning and fences are stripped before the preamble is located, so a
//! heading mentioned inside `<think>` cannot anchor the cut. Headings are
//! normalised before the title check, so a model that wrote
//! `# EXECUTIVE SUMMARY` still receives a real title. Section rules go in
//! last, after blank-line collapsing, so their spacing is exact.

use crate::prompts::{SECTION_HEADINGS, SUMMARY_TITLE};
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all summary rules to raw model output.
///
/// Rules (applied in order):
/// 1. Strip reasoning blocks (`<think>…</think>`, `<thinking>…</thinking>`)
/// 2. Strip outer markdown fences
/// 3. Normalise line endings (CRLF → LF)
/// 4. Drop everything before the first required heading
/// 5. Trim trailing whitespace per line
/// 6. Rewrite recognised section headings as `## HEADING`
/// 7. Prepend a `# ` title when missing
/// 8. Turn bare `Label: value` lines into `- **Label:** value`
/// 9. Wrap currency, percentage and CAGR figures in inline code
/// 10. Collapse 3+ consecutive blank lines down to 1
/// 11. Insert a `---` rule before every section heading but the first
/// 12. Strip invisible Unicode
/// 13. Ensure the text ends with exactly one newline
pub fn clean_summary(input: &str) -> String {
    let s = strip_reasoning(input);
    let s = strip_markdown_fences(&s);
    let s = normalise_line_endings(&s);
    let s = drop_preamble(&s);
    let s = trim_trailing_whitespace(&s);
    let s = normalise_section_headings(&s);
    let s = ensure_title(&s);
    let s = bullet_labels(&s);
    let s = highlight_figures(&s);
    let s = collapse_blank_lines(&s);
    let s = insert_section_rules(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip reasoning blocks ───────────────────────────────────────────

static RE_REASONING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>").unwrap());

static RE_REASONING_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<think(?:ing)?>").unwrap());

/// Remove model reasoning enclosed in `<think>` / `<thinking>` markers.
///
/// A dangling closing marker (the opening one was cut off upstream) drops
/// everything before it. An opening marker that is never closed (the model
/// ran out of tokens mid-thought) drops everything from it on.
pub fn strip_reasoning(input: &str) -> String {
    let mut s = RE_REASONING.replace_all(input, "").into_owned();
    for marker in ["</think>", "</thinking>"] {
        if let Some(pos) = s.rfind(marker) {
            s = s[pos + marker.len()..].to_string();
            break;
        }
    }
    if let Some(open) = RE_REASONING_OPEN.find(&s) {
        s.truncate(open.start());
    }
    s
}

// ── Rule 2: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 4: Drop preamble ────────────────────────────────────────────────────

/// Cut at the line holding the first required heading.
///
/// A line that *is* the heading wins over a sentence that merely mentions it
/// ("Below is the EXECUTIVE SUMMARY…"). Output without the heading is kept
/// whole.
fn drop_preamble(input: &str) -> String {
    let first = SECTION_HEADINGS[0];
    let mut offset = 0;
    let mut mention: Option<usize> = None;

    for line in input.split_inclusive('\n') {
        if section_heading(line) == Some(first) {
            return input[offset..].to_string();
        }
        if mention.is_none() && line.contains(first) {
            mention = Some(offset);
        }
        offset += line.len();
    }

    match mention {
        Some(pos) => input[pos..].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Normalise section headings ───────────────────────────────────────

static RE_LIST_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]|[IVX]+\.)\s+").unwrap());

/// The required heading this line spells, ignoring markdown markup.
///
/// Strips `#` prefixes, list numbering, bold/italic markers and a trailing
/// colon; the remaining text must equal a heading exactly (case-sensitive).
fn section_heading(line: &str) -> Option<&'static str> {
    let t = line.trim().trim_start_matches('#').trim();
    let t = RE_LIST_PREFIX.replace(t, "");
    let t = t
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .trim_end_matches(':')
        .trim_matches(|c| c == '*' || c == '_')
        .trim();
    SECTION_HEADINGS.iter().copied().find(|h| *h == t)
}

fn normalise_section_headings(input: &str) -> String {
    input
        .lines()
        .map(|line| match section_heading(line) {
            Some(h) => format!("## {h}"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: Ensure a title line ──────────────────────────────────────────────

fn ensure_title(input: &str) -> String {
    let first = input.lines().find(|l| !l.trim().is_empty());
    match first {
        Some(line) if line.starts_with("# ") => input.to_string(),
        _ => format!("{SUMMARY_TITLE}\n\n{}", input.trim_start_matches('\n')),
    }
}

// ── Rule 8: Bold bullet labels ───────────────────────────────────────────────
//
// "Market Size: $10.4 billion" reads as a label/value pair; render it as a
// bold-labelled list item. Labels are at most six words without punctuation
// other than & / ( ) ' -, so ordinary sentences containing a colon are left
// alone.

static RE_LABEL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][A-Za-z0-9&/()'\-]*(?: [A-Za-z0-9&/()'\-]+){0,5}):(?:[ \t]+(.*))?$")
        .unwrap()
});

fn bullet_labels(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            if is_markup_line(line) {
                return line.to_string();
            }
            match RE_LABEL_LINE.captures(line) {
                Some(caps) => {
                    let label = &caps[1];
                    match caps.get(2).map(|m| m.as_str().trim()).filter(|v| !v.is_empty()) {
                        Some(value) => format!("- **{label}:** {value}"),
                        None => format!("- **{label}:**"),
                    }
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Headings, list items, tables, quotes, rules and fences are never rewritten.
fn is_markup_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with('#')
        || t.starts_with('-')
        || t.starts_with('*')
        || t.starts_with('|')
        || t.starts_with('>')
        || t.starts_with("```")
        || t.starts_with('+')
}

// ── Rule 9: Highlight figures ────────────────────────────────────────────────

static RE_FIGURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"CAGR\s+(?:of\s+)?\d+(?:\.\d+)?\s?%",
        r"|[$€£¥]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:trillion|billion|million|thousand|bn|mn|[TBMK])\b)?",
        r"|\d+(?:\.\d+)?\s?%",
    ))
    .unwrap()
});

fn highlight_figures(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            RE_FIGURE
                .replace_all(line, |caps: &regex::Captures<'_>| {
                    let m = caps.get(0).map(|m| (m.start(), m.as_str())).unwrap_or((0, ""));
                    // Odd number of backticks before the match: already inside code.
                    if line[..m.0].matches('`').count() % 2 == 1 {
                        m.1.to_string()
                    } else {
                        format!("`{}`", m.1)
                    }
                })
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 10: Collapse excessive blank lines ──────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 11: Section separators ──────────────────────────────────────────────

/// Put every `## ` heading after a blank line, and every section heading but
/// the first after a `---` rule. A rule the model already placed before a
/// section heading is reused. Other subheadings get no rule.
fn insert_section_rules(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 64);
    let mut seen_section = false;

    for line in input.lines() {
        if line.starts_with("## ") {
            let is_section = section_heading(line).is_some();
            let trimmed = result.trim_end_matches('\n').len();
            result.truncate(trimmed);
            if is_section && (result.ends_with("\n---") || result == "---") {
                result.truncate(result.len() - 3);
                let trimmed = result.trim_end_matches('\n').len();
                result.truncate(trimmed);
            }
            if !result.is_empty() {
                result.push_str("\n\n");
            }
            if is_section {
                if seen_section {
                    result.push_str("---\n\n");
                }
                seen_section = true;
            }
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

// ── Rule 12: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 13: Ensure file ends with single newline ────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
