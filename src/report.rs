//! Output types returned by the analysis pipeline.

use crate::pipeline::extract::FallbackReason;
use crate::pipeline::llm::CompletionSource;
use crate::prompts::ANALYSIS_QUESTIONS;
use serde::{Deserialize, Serialize};

/// A report stored by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Storage path, e.g. `reports/1700000000000_q3_report.pdf`.
    pub path: String,
    /// Original file name as uploaded.
    pub name: String,
}

/// One of the ten scorecard criteria, in question order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    PublicationDate,
    Author,
    Tam,
    Cagr,
    CustomerSegments,
    CompetitiveLandscape,
    EmergingTech,
    IndustryTrends,
    GeographicBreakdown,
    RegulatoryRequirements,
}

impl Criterion {
    /// All criteria in the order of [`ANALYSIS_QUESTIONS`].
    pub const ALL: [Criterion; 10] = [
        Criterion::PublicationDate,
        Criterion::Author,
        Criterion::Tam,
        Criterion::Cagr,
        Criterion::CustomerSegments,
        Criterion::CompetitiveLandscape,
        Criterion::EmergingTech,
        Criterion::IndustryTrends,
        Criterion::GeographicBreakdown,
        Criterion::RegulatoryRequirements,
    ];

    /// JSON key of this criterion.
    pub fn key(self) -> &'static str {
        match self {
            Criterion::PublicationDate => "has_publication_date",
            Criterion::Author => "has_author",
            Criterion::Tam => "has_tam",
            Criterion::Cagr => "has_cagr",
            Criterion::CustomerSegments => "has_customer_segments",
            Criterion::CompetitiveLandscape => "has_competitive_landscape",
            Criterion::EmergingTech => "has_emerging_tech",
            Criterion::IndustryTrends => "has_industry_trends",
            Criterion::GeographicBreakdown => "has_geographic_breakdown",
            Criterion::RegulatoryRequirements => "has_regulatory_requirements",
        }
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            Criterion::PublicationDate => "Publication date included",
            Criterion::Author => "Author or research organization identified",
            Criterion::Tam => "Total Addressable Market (TAM) values provided",
            Criterion::Cagr => "Compound Annual Growth Rate (CAGR) presented",
            Criterion::CustomerSegments => "Distinct customer segments identified",
            Criterion::CompetitiveLandscape => "Competitive landscape described",
            Criterion::EmergingTech => "Emerging technologies or innovations included",
            Criterion::IndustryTrends => "Industry trends discussed",
            Criterion::GeographicBreakdown => "Regional or geographic breakdown provided",
            Criterion::RegulatoryRequirements => "Regulatory requirements identified",
        }
    }

    /// The yes/no question asked for this criterion.
    pub fn question(self) -> &'static str {
        ANALYSIS_QUESTIONS[self as usize]
    }
}

/// Ten boolean criteria plus their count.
///
/// `total_score` always equals the number of `true` criteria: the only
/// constructor computes it, and no field is publicly mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scorecard {
    has_publication_date: bool,
    has_author: bool,
    has_tam: bool,
    has_cagr: bool,
    has_customer_segments: bool,
    has_competitive_landscape: bool,
    has_emerging_tech: bool,
    has_industry_trends: bool,
    has_geographic_breakdown: bool,
    has_regulatory_requirements: bool,
    total_score: u8,
}

impl Scorecard {
    /// Build a scorecard from ten answers in question order.
    pub fn from_answers(answers: [bool; 10]) -> Self {
        let total_score = answers.iter().filter(|&&a| a).count() as u8;
        Self {
            has_publication_date: answers[0],
            has_author: answers[1],
            has_tam: answers[2],
            has_cagr: answers[3],
            has_customer_segments: answers[4],
            has_competitive_landscape: answers[5],
            has_emerging_tech: answers[6],
            has_industry_trends: answers[7],
            has_geographic_breakdown: answers[8],
            has_regulatory_requirements: answers[9],
            total_score,
        }
    }

    /// The ten answers in question order.
    pub fn answers(&self) -> [bool; 10] {
        [
            self.has_publication_date,
            self.has_author,
            self.has_tam,
            self.has_cagr,
            self.has_customer_segments,
            self.has_competitive_landscape,
            self.has_emerging_tech,
            self.has_industry_trends,
            self.has_geographic_breakdown,
            self.has_regulatory_requirements,
        ]
    }

    pub fn get(&self, criterion: Criterion) -> bool {
        self.answers()[criterion as usize]
    }

    pub fn total_score(&self) -> u8 {
        self.total_score
    }
}

/// A five-section markdown summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
}

/// The `results` object of a successful analysis.
///
/// Serialised untagged so the scorecard keys (or `summary`) sit directly
/// under `results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportResults {
    Scorecard(Scorecard),
    Summary(Summary),
}

/// Where the analysed text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Text extracted from the uploaded PDF.
    Extracted,
    /// The built-in sample report.
    Fallback,
}

/// How each result was obtained, so degraded answers are visible to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub text: TextSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    pub completion: CompletionSource,
    /// Numbered answers found in the model output (scorecard only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers_found: Option<usize>,
}

impl Provenance {
    /// True when any stage substituted canned data.
    pub fn is_degraded(&self) -> bool {
        self.text == TextSource::Fallback
            || self.completion == CompletionSource::Canned
            || self.answers_found.is_some_and(|n| n != 10)
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutcome {
    pub results: ReportResults,
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_score_counts_true_answers() {
        let card = Scorecard::from_answers([
            true, false, true, true, false, true, false, true, true, false,
        ]);
        assert_eq!(card.total_score(), 6);
        assert!(card.get(Criterion::Cagr));
        assert!(!card.get(Criterion::Author));
    }

    #[test]
    fn scorecard_serialises_flat_keys() {
        let card = Scorecard::from_answers([true; 10]);
        let json = serde_json::to_value(ReportResults::Scorecard(card)).unwrap();
        for c in Criterion::ALL {
            assert_eq!(json[c.key()], true, "{}", c.key());
        }
        assert_eq!(json["total_score"], 10);
    }

    #[test]
    fn summary_serialises_under_summary_key() {
        let json = serde_json::to_value(ReportResults::Summary(Summary {
            summary: "# T".into(),
        }))
        .unwrap();
        assert_eq!(json["summary"], "# T");
    }

    #[test]
    fn criteria_line_up_with_questions() {
        assert!(Criterion::Cagr.question().contains("CAGR"));
        assert!(Criterion::PublicationDate.question().contains("publication date"));
        assert!(Criterion::RegulatoryRequirements
            .question()
            .contains("regulatory"));
    }

    #[test]
    fn provenance_flags_degraded_runs() {
        let clean = Provenance {
            text: TextSource::Extracted,
            fallback_reason: None,
            completion: CompletionSource::Model,
            answers_found: Some(10),
        };
        assert!(!clean.is_degraded());

        let padded = Provenance {
            answers_found: Some(8),
            ..clean.clone()
        };
        assert!(padded.is_degraded());

        let canned = Provenance {
            completion: CompletionSource::Canned,
            ..clean
        };
        assert!(canned.is_degraded());
    }
}
