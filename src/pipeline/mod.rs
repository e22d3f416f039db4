//! Pipeline stages for PDF-to-insight analysis.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ prompt ──▶ llm ──▶ scorecard | postprocess
//! (pdf text)  (bounded)  (Groq)   (yes/no)    (markdown)
//! ```
//!
//! 1. [`extract`]: PDF bytes to plain text under `spawn_blocking`, with the
//!    sample report substituted on any failure
//! 2. [`prompt`]: bound the text for the mode and build the [`llm::LlmRequest`]
//! 3. [`llm`]: a single chat-completion call; the only stage with
//!    network I/O
//! 4. [`scorecard`]: count numbered yes/no answers into a scorecard
//! 5. [`postprocess`]: deterministic cleanup of summary markdown

pub mod extract;
pub mod llm;
pub mod postprocess;
pub mod prompt;
pub mod scorecard;
