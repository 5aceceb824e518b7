//! Pattern matching over canonical command tokens.
//!
//! A pattern is a template of literal tokens and `{name}` placeholders,
//! tagged with an intent, a domain, and a set of mandatory keywords.
//! Matching aligns template literals in order against the input tokens;
//! placeholders capture the tokens between matched literals.
//!
//! Scoring combines keyword overlap, placeholder-fill success, and token
//! coverage. Two guarantees hold regardless of weights:
//! - a pattern none of whose mandatory keywords appear in the input is
//!   discarded before scoring, so it can never outrank one whose keywords
//!   are present;
//! - ties break by registration order (stable sort), so results are
//!   deterministic and reproducible.
//!
//! Pattern tables are declarative YAML, loaded once per domain into
//! read-only state.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::normalize::NormalizedInput;
use crate::types::{ParamValue, ProcessError, Result};

/// Candidates scoring below this are dropped. An empty match list is not an
/// error at this layer; the Parser turns it into `UnrecognizedIntent`.
pub const MIN_SCORE: f64 = 0.3;

// Score weights. Any monotonic combination satisfies the contract; these
// keep exact template matches at 1.0.
const W_KEYWORDS: f64 = 0.45;
const W_FILL: f64 = 0.30;
const W_COVERAGE: f64 = 0.25;

// ---------------------------------------------------------------------------
// Pattern — one template row from the YAML table
// ---------------------------------------------------------------------------

/// Placeholder type, declared per slot in the pattern table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    /// Captures a single token.
    #[default]
    Word,
    /// Captures a single token that must parse as a number.
    Number,
    /// Captures everything up to the next matched literal (or end of input).
    Tail,
}

/// A template element after parsing: a literal token or a named placeholder.
#[derive(Debug, Clone, PartialEq)]
enum TplElement {
    Literal(String),
    Slot(String),
}

/// An immutable, registered command pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub intent: String,
    pub domain: String,
    pub template: String,
    /// Mandatory keywords: at least one must appear in the input.
    pub keywords: Vec<String>,
    /// Extra parameters injected verbatim on every match of this pattern.
    pub defaults: BTreeMap<String, ParamValue>,
    slots: HashMap<String, SlotType>,
    elements: Vec<TplElement>,
}

impl Pattern {
    fn parse_template(template: &str) -> Vec<TplElement> {
        template
            .split_whitespace()
            .map(|tok| {
                if let Some(name) = tok.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
                    TplElement::Slot(name.to_string())
                } else {
                    TplElement::Literal(tok.to_string())
                }
            })
            .collect()
    }

    fn literal_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, TplElement::Literal(_)))
            .count()
    }

    fn slot_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, TplElement::Slot(_)))
            .count()
    }
}

// ---------------------------------------------------------------------------
// YAML schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PatternTableYaml {
    domain: String,
    patterns: Vec<PatternYaml>,
}

#[derive(Debug, Deserialize)]
struct PatternYaml {
    intent: String,
    template: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    slots: HashMap<String, SlotType>,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
}

// ---------------------------------------------------------------------------
// PatternSet — the registered table for one domain
// ---------------------------------------------------------------------------

/// All patterns of one domain, in registration order.
#[derive(Debug)]
pub struct PatternSet {
    pub domain: String,
    patterns: Vec<Pattern>,
}

/// One ranked match: the pattern, the extracted parameters, and the score.
#[derive(Debug, Clone)]
pub struct PatternMatch<'p> {
    pub pattern: &'p Pattern,
    pub parameters: BTreeMap<String, ParamValue>,
    pub score: f64,
}

impl PatternSet {
    /// Load a pattern table from its YAML source.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let table: PatternTableYaml = serde_yaml::from_str(yaml)
            .map_err(|e| ProcessError::PatternTable(format!("invalid pattern table: {}", e)))?;

        let patterns = table
            .patterns
            .into_iter()
            .map(|p| {
                let elements = Pattern::parse_template(&p.template);
                Pattern {
                    intent: p.intent,
                    domain: table.domain.clone(),
                    template: p.template,
                    keywords: p.keywords,
                    defaults: p.params,
                    slots: p.slots,
                    elements,
                }
            })
            .collect();

        Ok(Self {
            domain: table.domain,
            patterns,
        })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Match normalized input against every registered pattern and return
    /// candidates at or above `MIN_SCORE`, best first. Ties keep
    /// registration order.
    pub fn match_text<'p>(&'p self, input: &NormalizedInput) -> Vec<PatternMatch<'p>> {
        let tokens = &input.canonical_tokens;
        let mut candidates: Vec<PatternMatch<'p>> = Vec::new();

        for pattern in &self.patterns {
            // Mandatory-keyword guard: discard outright when none appear.
            if !pattern.keywords.is_empty()
                && !pattern.keywords.iter().any(|k| tokens.contains(k))
            {
                continue;
            }

            if let Some(m) = align(pattern, tokens) {
                if m.score >= MIN_SCORE {
                    candidates.push(m);
                }
            }
        }

        // Stable sort: equal scores keep registration order.
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates
    }
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Align a pattern's template against the token stream.
///
/// Literals are searched left to right; a placeholder captures the tokens
/// between its position and the next matched literal (or the end of input).
/// Missing literals are skipped rather than failing the whole pattern; the
/// score reflects how much matched.
fn align<'p>(pattern: &'p Pattern, tokens: &[String]) -> Option<PatternMatch<'p>> {
    let mut parameters: BTreeMap<String, ParamValue> = BTreeMap::new();
    let mut pos = 0usize;
    let mut matched_literals = 0usize;
    let mut captured_tokens = 0usize;
    let mut pending_slot: Option<&str> = None;

    for element in &pattern.elements {
        match element {
            TplElement::Literal(lit) => {
                if let Some(offset) = tokens[pos.min(tokens.len())..].iter().position(|t| t == lit)
                {
                    let j = pos + offset;
                    if let Some(slot) = pending_slot.take() {
                        captured_tokens +=
                            capture(pattern, slot, &tokens[pos..j], &mut parameters);
                    }
                    matched_literals += 1;
                    pos = j + 1;
                }
                // Literal absent: leave any pending slot pending; it will
                // capture up to the next literal that does match.
            }
            TplElement::Slot(name) => {
                if let Some(prev) = pending_slot.take() {
                    // Two placeholders with no literal between them: a
                    // pending number slot grabs one leading numeric token
                    // ("top {limit} {table}"); anything else captures
                    // nothing.
                    let prev_is_number =
                        pattern.slots.get(prev).copied().unwrap_or_default() == SlotType::Number;
                    if prev_is_number
                        && pos < tokens.len()
                        && tokens[pos].parse::<f64>().is_ok()
                    {
                        captured_tokens +=
                            capture(pattern, prev, &tokens[pos..pos + 1], &mut parameters);
                        pos += 1;
                    }
                }
                pending_slot = Some(name);
            }
        }
    }
    if let Some(slot) = pending_slot {
        captured_tokens += capture(pattern, slot, &tokens[pos.min(tokens.len())..], &mut parameters);
    }

    let total_literals = pattern.literal_count();
    let total_slots = pattern.slot_count();

    let kw_score = if total_literals == 0 {
        1.0
    } else {
        matched_literals as f64 / total_literals as f64
    };
    let fill_score = if total_slots == 0 {
        1.0
    } else {
        parameters.len().min(total_slots) as f64 / total_slots as f64
    };
    let coverage = if tokens.is_empty() {
        0.0
    } else {
        ((matched_literals + captured_tokens) as f64 / tokens.len() as f64).min(1.0)
    };

    let score = W_KEYWORDS * kw_score + W_FILL * fill_score + W_COVERAGE * coverage;

    // Inject pattern-level default parameters (never overriding extractions).
    for (k, v) in &pattern.defaults {
        parameters.entry(k.clone()).or_insert_with(|| v.clone());
    }

    Some(PatternMatch {
        pattern,
        parameters,
        score,
    })
}

/// Convert a captured token span into a parameter according to the slot's
/// declared type. Returns how many input tokens the capture consumed.
fn capture(
    pattern: &Pattern,
    slot: &str,
    span: &[String],
    parameters: &mut BTreeMap<String, ParamValue>,
) -> usize {
    if span.is_empty() {
        return 0;
    }
    let slot_type = pattern.slots.get(slot).copied().unwrap_or_default();
    match slot_type {
        SlotType::Word => {
            parameters.insert(slot.to_string(), ParamValue::Str(span[0].clone()));
            1
        }
        SlotType::Number => match span[0].parse::<f64>() {
            Ok(n) => {
                parameters.insert(slot.to_string(), ParamValue::Num(n));
                1
            }
            Err(_) => 0,
        },
        SlotType::Tail => {
            parameters.insert(slot.to_string(), ParamValue::Str(span.join(" ")));
            span.len()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
