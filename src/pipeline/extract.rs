//! Text extraction: PDF bytes → plain text, never failing.
//!
//! Extraction favours availability over correctness: anything that prevents
//! real text from coming out of the PDF (empty upload, unreadable file, parser
//! panic, timeout) substitutes [`SAMPLE_REPORT`]. Unlike a bare string, the
//! returned [`ExtractedText`] says which of the two happened and why, so the
//! substitution shows up in the response provenance and not only in logs.
//!
//! `pdf_extract` is synchronous, CPU-bound and may panic on malformed input,
//! so parsing runs under `spawn_blocking`; a panic surfaces as a `JoinError`
//! and the whole call is bounded by a `tokio::time::timeout`.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why the sample report was used instead of extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Local fallback mode is enabled.
    Requested,
    /// The upload was empty.
    EmptyInput,
    /// Parsing succeeded but produced only whitespace (e.g. scanned pages).
    EmptyText,
    /// The parser returned an error.
    ParseFailed,
    /// The parser panicked.
    Panicked,
    /// Parsing exceeded the configured time bound.
    TimedOut,
}

/// Text handed to the prompt builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedText {
    /// Text extracted from the PDF.
    Real(String),
    /// The sample report, substituted for the given reason.
    Fallback {
        text: String,
        reason: FallbackReason,
    },
}

impl ExtractedText {
    fn fallback(reason: FallbackReason) -> Self {
        ExtractedText::Fallback {
            text: SAMPLE_REPORT.to_string(),
            reason,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ExtractedText::Real(text) => text,
            ExtractedText::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ExtractedText::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            ExtractedText::Real(_) => None,
            ExtractedText::Fallback { reason, .. } => Some(*reason),
        }
    }
}

/// Extract plain text from PDF bytes.
///
/// Returns the sample report when `use_fallback` is set or `bytes` is empty,
/// and whenever parsing fails, panics, yields only whitespace, or runs longer
/// than `timeout`.
pub async fn extract(bytes: Vec<u8>, use_fallback: bool, timeout: Duration) -> ExtractedText {
    if use_fallback {
        info!("Local fallback mode: using sample report text");
        return ExtractedText::fallback(FallbackReason::Requested);
    }
    if bytes.is_empty() {
        warn!("Empty PDF upload, using sample report text");
        return ExtractedText::fallback(FallbackReason::EmptyInput);
    }

    let size = bytes.len();
    let parse = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes));

    match tokio::time::timeout(timeout, parse).await {
        Ok(Ok(Ok(text))) => {
            if text.trim().is_empty() {
                warn!("PDF parsing returned empty text ({} bytes in), using sample report", size);
                ExtractedText::fallback(FallbackReason::EmptyText)
            } else {
                debug!("Extracted {} chars from {} byte PDF", text.chars().count(), size);
                ExtractedText::Real(text)
            }
        }
        Ok(Ok(Err(e))) => {
            warn!("Error parsing PDF, using sample report: {}", e);
            ExtractedText::fallback(FallbackReason::ParseFailed)
        }
        Ok(Err(join_err)) => {
            warn!("PDF parser panicked, using sample report: {}", join_err);
            ExtractedText::fallback(FallbackReason::Panicked)
        }
        Err(_) => {
            warn!(
                "PDF parsing timed out after {}s, using sample report",
                timeout.as_secs()
            );
            ExtractedText::fallback(FallbackReason::TimedOut)
        }
    }
}

/// The sample report substituted whenever real extraction is unavailable.
pub const SAMPLE_REPORT: &str = r#"
MARKET RESEARCH REPORT
Global Artificial Intelligence in Healthcare Market
Publication Date: March 15, 2023
Prepared by: HealthTech Analytics Inc.

EXECUTIVE SUMMARY
The global Artificial Intelligence in Healthcare market was valued at $10.4 billion in 2022 and is projected to reach $187.95 billion by 2030, growing at a CAGR of 37.5% during the forecast period.

MARKET SEGMENTATION
By Application:
- Medical Diagnosis: 35%
- Drug Discovery: 25%
- Patient Monitoring: 20%
- Others: 20%

By End User:
- Hospitals & Clinics: 45%
- Pharmaceutical Companies: 30%
- Research Institutions: 15%
- Others: 10%

REGIONAL ANALYSIS
- North America: 42%
- Europe: 28%
- Asia Pacific: 21%
- Rest of World: 9%

COMPETITIVE LANDSCAPE
Key players include:
- NVIDIA Corporation
- IBM Corporation
- Microsoft Corporation
- Google LLC
- Apple Inc.
- Amazon Web Services

EMERGING TECHNOLOGIES
Machine Learning algorithms, Natural Language Processing, and Computer Vision technologies are driving innovation in healthcare AI solutions.

REGULATORY CONSIDERATIONS
FDA regulations for AI/ML-based software as medical devices (SaMD) continue to evolve, with the proposed regulatory framework aiming to address the unique characteristics of these technologies.
"#;

/// A minimal one-page PDF showing `text` in Helvetica.
#[cfg(test)]
pub(crate) fn one_page_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}
