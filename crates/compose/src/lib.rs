//! Day composition for Lectern.
//!
//! Ties retrieval, prompting, routed generation and the usage ledger into
//! one pipeline that always returns a grounded day, falling back to direct
//! assembly from reference material when generation is unavailable.

pub mod fallback;
pub mod orchestrator;
pub mod parse;
pub mod report;
pub mod types;


// Re-export commonly used types
pub use fallback::deterministic_day;
pub use orchestrator::{Composer, DEFAULT_RETRIEVAL_LIMIT};
pub use parse::{parse_composed_day, ParseOutcome, ParsedDay};
pub use report::{clamp_word_target, composition_report, max_output_tokens};
pub use types::{
    ComposeRequest, ComposeResult, ComposedDay, CompositionReport, DayAnchor, Endnote,
    GenerationOutcome, Principal, Stage, DEFAULT_WORD_TARGET,
};
