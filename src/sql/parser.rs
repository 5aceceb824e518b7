//! Parser for SQL-domain commands.
//!
//! The pattern table decides the query shape (plain select, grouped top-N
//! by aggregate, count, delete) and captures table / measure / limit
//! mentions as raw tokens. Supplemental scans pick up comparison
//! conditions ("wiek powyżej 30", "price > 100"), sort requests, and
//! limits the templates didn't cover. All identifier mentions stay raw
//! here; the Translator resolves them against the schema.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::matcher::PatternSet;
use crate::normalize::normalize;
use crate::registry::Parser;
use crate::types::{ParamValue, ParseResult, ProcessError, Result};

use super::DOMAIN;

// ---------------------------------------------------------------------------
// Pattern table
// ---------------------------------------------------------------------------

const EMBEDDED_PATTERNS: &str = include_str!("../../data/sql_patterns.yaml");

static PATTERNS: OnceLock<PatternSet> = OnceLock::new();

/// The SQL-domain pattern table (loaded once, disk-first with embedded
/// fallback).
pub fn patterns() -> &'static PatternSet {
    PATTERNS.get_or_init(|| {
        let yaml = std::fs::read_to_string("data/sql_patterns.yaml")
            .ok()
            .unwrap_or_else(|| EMBEDDED_PATTERNS.to_string());
        PatternSet::from_yaml(&yaml).unwrap_or_else(|e| {
            tracing::warn!("failed to parse data/sql_patterns.yaml ({e}), using embedded");
            PatternSet::from_yaml(EMBEDDED_PATTERNS).expect("embedded sql_patterns.yaml must parse")
        })
    })
}

// ---------------------------------------------------------------------------
// SqlParser
// ---------------------------------------------------------------------------

pub struct SqlParser;

impl Parser for SqlParser {
    fn parse(&self, text: &str) -> Result<ParseResult> {
        let normalized = normalize(text);
        let matches = patterns().match_text(&normalized);

        let best = matches
            .first()
            .ok_or_else(|| ProcessError::UnrecognizedIntent {
                domain: DOMAIN.to_string(),
                text: text.to_string(),
            })?;

        let mut parameters = best.parameters.clone();
        let tokens = &normalized.canonical_tokens;
        scan_conditions(tokens, &mut parameters);
        scan_sort(tokens, &mut parameters);
        scan_limit(tokens, &mut parameters);

        Ok(ParseResult {
            intent: best.pattern.intent.clone(),
            domain: DOMAIN.to_string(),
            parameters,
            confidence: best.score.min(1.0),
            source_text: text.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Supplemental scans
// ---------------------------------------------------------------------------

const COMPARISON_SYMBOLS: &[&str] = &[">=", "<=", "<>", ">", "<", "="];

/// Extract comparison conditions as flattened `where_{i}_*` parameters.
/// The field is the raw mention preceding the operator; the Translator
/// resolves it to a column.
fn scan_conditions(tokens: &[String], parameters: &mut BTreeMap<String, ParamValue>) {
    let mut index = 0usize;
    let mut i = 0usize;

    while i < tokens.len() {
        let tok = tokens[i].as_str();

        // symbolic: <mention> >= <value>
        if COMPARISON_SYMBOLS.contains(&tok) && i > 0 {
            if let Some(value) = tokens.get(i + 1) {
                push_condition(parameters, &mut index, &tokens[i - 1], tok, value);
                i += 2;
                continue;
            }
        }

        // worded: <mention> larger than <value>
        match tok {
            cmp @ ("larger" | "smaller") if i > 0 => {
                let (value_at, op) = if tokens.get(i + 1).map(String::as_str) == Some("than") {
                    (i + 2, if cmp == "larger" { ">" } else { "<" })
                } else {
                    (i + 1, if cmp == "larger" { ">" } else { "<" })
                };
                if let Some(value) = tokens.get(value_at) {
                    push_condition(parameters, &mut index, &tokens[i - 1], op, value);
                    i = value_at + 1;
                    continue;
                }
            }
            "equal" if i > 0 => {
                let value_at = if tokens.get(i + 1).map(String::as_str) == Some("to") {
                    i + 2
                } else {
                    i + 1
                };
                if let Some(value) = tokens.get(value_at) {
                    push_condition(parameters, &mut index, &tokens[i - 1], "=", value);
                    i = value_at + 1;
                    continue;
                }
            }
            "containing" if i > 0 => {
                if let Some(value) = tokens.get(i + 1) {
                    push_condition(parameters, &mut index, &tokens[i - 1], "like", value);
                    i += 2;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
}

fn push_condition(
    parameters: &mut BTreeMap<String, ParamValue>,
    index: &mut usize,
    field: &str,
    op: &str,
    value: &str,
) {
    parameters.insert(format!("where_{index}_field"), ParamValue::Str(field.into()));
    parameters.insert(format!("where_{index}_op"), ParamValue::Str(op.into()));
    let value = match value.parse::<f64>() {
        Ok(n) => ParamValue::Num(n),
        Err(_) => ParamValue::Str(value.to_string()),
    };
    parameters.insert(format!("where_{index}_value"), value);
    *index += 1;
}

/// Extract "sort [by] <mention> [direction]" requests.
fn scan_sort(tokens: &[String], parameters: &mut BTreeMap<String, ParamValue>) {
    let Some(at) = tokens.iter().position(|t| t == "sort") else {
        return;
    };
    let column_at = if tokens.get(at + 1).map(String::as_str) == Some("by") {
        at + 2
    } else {
        at + 1
    };
    let Some(column) = tokens.get(column_at) else {
        return;
    };
    parameters.insert("order_by".to_string(), ParamValue::Str(column.clone()));

    let descending = tokens
        .iter()
        .any(|t| t == "descending" || t == "largest");
    let ascending = tokens
        .iter()
        .any(|t| t == "ascending" || t == "smallest");
    let dir = if descending && !ascending { "desc" } else { "asc" };
    parameters.insert("order_dir".to_string(), ParamValue::Str(dir.to_string()));
}

/// Extract a row limit ("top 5", "5 top", "limit 20") when no template
/// slot already captured one.
fn scan_limit(tokens: &[String], parameters: &mut BTreeMap<String, ParamValue>) {
    if parameters.contains_key("limit") {
        return;
    }
    for (i, tok) in tokens.iter().enumerate() {
        if tok == "top" || tok == "limit" {
            let neighbor = tokens
                .get(i + 1)
                .and_then(|t| t.parse::<f64>().ok())
                .or_else(|| {
                    i.checked_sub(1)
                        .and_then(|j| tokens.get(j))
                        .and_then(|t| t.parse::<f64>().ok())
                });
            if let Some(n) = neighbor {
                parameters.insert("limit".to_string(), ParamValue::Num(n));
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_aggregate_scenario() {
        let parsed = SqlParser
            .parse("pokaż 10 najlepszych klientów z największą sumą zamówień")
            .unwrap();
        assert_eq!(parsed.intent, "select_top_aggregate");
        assert_eq!(parsed.domain, "sql");
        assert_eq!(parsed.get_num("limit"), Some(10.0));
        assert_eq!(parsed.get_str("table"), Some("klientów"));
        assert_eq!(parsed.get_str("measure"), Some("zamówień"));
        assert_eq!(parsed.get_str("direction"), Some("largest"));
        assert_eq!(parsed.get_str("agg"), Some("SUM"));
    }

    #[test]
    fn test_english_top_aggregate() {
        let parsed = SqlParser
            .parse("show top 5 customers with highest total orders")
            .unwrap();
        assert_eq!(parsed.intent, "select_top_aggregate");
        assert_eq!(parsed.get_num("limit"), Some(5.0));
        assert_eq!(parsed.get_str("table"), Some("customers"));
        assert_eq!(parsed.get_str("measure"), Some("orders"));
    }

    #[test]
    fn test_select_with_condition() {
        let parsed = SqlParser.parse("pokaż klientów z wiek powyżej 30").unwrap();
        assert_eq!(parsed.intent, "select_all");
        assert_eq!(parsed.get_str("table"), Some("klientów"));
        assert_eq!(parsed.get_str("where_0_field"), Some("wiek"));
        assert_eq!(parsed.get_str("where_0_op"), Some(">"));
        assert_eq!(parsed.get_num("where_0_value"), Some(30.0));
    }

    #[test]
    fn test_symbolic_condition() {
        let parsed = SqlParser.parse("show customers with age >= 18").unwrap();
        assert_eq!(parsed.get_str("where_0_field"), Some("age"));
        assert_eq!(parsed.get_str("where_0_op"), Some(">="));
        assert_eq!(parsed.get_num("where_0_value"), Some(18.0));
    }

    #[test]
    fn test_count_intent() {
        let parsed = SqlParser.parse("policz zamówienia").unwrap();
        assert_eq!(parsed.intent, "count_rows");
        assert_eq!(parsed.get_str("table"), Some("zamówienia"));
    }

    #[test]
    fn test_sort_scan() {
        let parsed = SqlParser.parse("pokaż klientów sortuj według miasto malejąco").unwrap();
        assert_eq!(parsed.get_str("order_by"), Some("miasto"));
        assert_eq!(parsed.get_str("order_dir"), Some("desc"));
    }

    #[test]
    fn test_unrecognized_fails() {
        let err = SqlParser.parse("bez sensu gadanie").unwrap_err();
        assert!(matches!(err, ProcessError::UnrecognizedIntent { .. }));
    }
}
