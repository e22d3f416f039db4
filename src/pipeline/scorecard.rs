//! Scorecard interpretation: numbered yes/no lines → [`Scorecard`].

use crate::config::ParsePolicy;
use crate::error::AnalyzeError;
use crate::pipeline::postprocess::strip_reasoning;
use crate::report::Scorecard;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Number of answers a complete scorecard has.
pub const EXPECTED_ANSWERS: usize = 10;

static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.").unwrap());

/// The yes/no answers found in model output, in order.
///
/// Only lines that start with `<digits>.` count; a line is "yes" when it
/// contains `yes` in any case. Reasoning blocks are removed first so numbered
/// lists inside `<think>` do not leak into the answers.
pub fn extract_answers(output: &str) -> Vec<bool> {
    strip_reasoning(output)
        .lines()
        .map(str::trim)
        .filter(|line| RE_NUMBERED.is_match(line))
        .map(|line| line.to_lowercase().contains("yes"))
        .collect()
}

/// Parse model output into a scorecard.
///
/// Returns the scorecard and the number of answers actually found. Under
/// [`ParsePolicy::Strict`] any count other than ten is an
/// [`AnalyzeError::AnalysisFormat`]; under [`ParsePolicy::Lenient`] missing
/// answers count as "no" and extras are dropped.
pub fn parse_scorecard(
    output: &str,
    policy: ParsePolicy,
) -> Result<(Scorecard, usize), AnalyzeError> {
    let found = extract_answers(output);
    let count = found.len();

    if count != EXPECTED_ANSWERS {
        match policy {
            ParsePolicy::Strict => {
                return Err(AnalyzeError::AnalysisFormat {
                    expected: EXPECTED_ANSWERS,
                    found: count,
                })
            }
            ParsePolicy::Lenient => warn!(
                "Expected {} answers from the model, found {}; padding with 'no'",
                EXPECTED_ANSWERS, count
            ),
        }
    }

    let mut answers = [false; EXPECTED_ANSWERS];
    for (slot, answer) in answers.iter_mut().zip(found) {
        *slot = answer;
    }
    Ok((Scorecard::from_answers(answers), count))
}
