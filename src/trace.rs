//! Debug entrypoints: expose the intermediate stages of processing for
//! inspection. Built strictly on the public contracts — no internal state.

use crate::matcher::PatternSet;
use crate::normalize::normalize;
use crate::processor::Processor;
use crate::types::{DomainCommand, ParseResult, Result};

// ---------------------------------------------------------------------------
// DebugReport — the front half of processing, laid open
// ---------------------------------------------------------------------------

/// Intermediate states of one command: what the parser saw and what the
/// translator produced. Nothing is executed.
#[derive(Debug, Clone)]
pub struct DebugReport {
    pub input: String,
    pub parse: ParseResult,
    pub command: DomainCommand,
}

/// Parse and translate a command, returning every intermediate stage.
pub fn debug_process(
    processor: &Processor,
    text: &str,
    domain: Option<&str>,
) -> Result<DebugReport> {
    let (parse, command) = processor.analyze(text, domain)?;
    Ok(DebugReport {
        input: text.to_string(),
        parse,
        command,
    })
}

// ---------------------------------------------------------------------------
// Pattern candidate inspection
// ---------------------------------------------------------------------------

/// One ranked pattern candidate for an input, for "why did this match"
/// inspection.
#[derive(Debug, Clone)]
pub struct CandidateInfo {
    pub intent: String,
    pub template: String,
    pub score: f64,
    pub parameters: Vec<(String, String)>,
}

/// Rank every pattern of a table against the input, best first.
pub fn debug_candidates(set: &PatternSet, text: &str) -> Vec<CandidateInfo> {
    set.match_text(&normalize(text))
        .into_iter()
        .map(|m| CandidateInfo {
            intent: m.pattern.intent.clone(),
            template: m.pattern.template.clone(),
            score: m.score,
            parameters: m
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect(),
        })
        .collect()
}
