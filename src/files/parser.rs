//! Parser for file-operation commands.
//!
//! The pattern table decides the intent and the primary parameters
//! (extension, directory, destination, name). A supplemental scan over the
//! canonical tokens extracts filter predicates — size, age, content — the
//! same way regardless of intent, so "znajdź pliki txt większe niż 1 mb"
//! and a bare "wybierz te większe niż 1 mb" share one code path.

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

const EMBEDDED_PATTERNS: &str = include_str!("../../data/file_patterns.yaml");

static PATTERNS: OnceLock<PatternSet> = OnceLock::new();

/// The file-domain pattern table (loaded once, disk-first with embedded
/// fallback).
pub fn patterns() -> &'static PatternSet {
    PATTERNS.get_or_init(|| {
        let yaml = std::fs::read_to_string("data/file_patterns.yaml")
            .ok()
            .unwrap_or_else(|| EMBEDDED_PATTERNS.to_string());
        PatternSet::from_yaml(&yaml).unwrap_or_else(|e| {
            tracing::warn!("failed to parse data/file_patterns.yaml ({e}), using embedded");
            PatternSet::from_yaml(EMBEDDED_PATTERNS).expect("embedded file_patterns.yaml must parse")
        })
    })
}

// ---------------------------------------------------------------------------
// FileParser
// ---------------------------------------------------------------------------

pub struct FileParser;

impl Parser for FileParser {
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
        scan_predicates(&normalized.canonical_tokens, &mut parameters);

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
// Supplemental predicate extraction
// ---------------------------------------------------------------------------

const SIZE_UNITS: &[(&str, f64)] = &[
    ("b", 1.0),
    ("kb", 1024.0),
    ("mb", 1024.0 * 1024.0),
    ("gb", 1024.0 * 1024.0 * 1024.0),
    ("tb", 1024.0 * 1024.0 * 1024.0 * 1024.0),
];

const AGE_UNITS: &[(&str, f64)] = &[
    ("days", 1.0),
    ("weeks", 7.0),
    ("months", 30.0),
    ("years", 365.0),
];

/// Scan canonical tokens for filter conditions and store them as flattened
/// `where_{i}_{field,op,value}` parameters. Sizes are normalized to bytes,
/// ages to days.
fn scan_predicates(tokens: &[String], parameters: &mut BTreeMap<String, ParamValue>) {
    let mut index = 0usize;
    let mut i = 0usize;

    while i < tokens.len() {
        match tokens[i].as_str() {
            cmp @ ("larger" | "smaller") => {
                // larger than <n> [unit] — unit decides size vs age
                if let Some((value, consumed)) = number_after_than(&tokens[i + 1..]) {
                    let after = tokens.get(i + 1 + consumed).map(String::as_str);
                    let op = if cmp == "larger" { ">" } else { "<" };
                    if let Some(factor) = after.and_then(unit_factor(SIZE_UNITS)) {
                        push_predicate(parameters, &mut index, "size", op, value * factor);
                        i += 2 + consumed;
                        continue;
                    }
                    push_predicate(parameters, &mut index, "size", op, value);
                    i += 1 + consumed;
                    continue;
                }
            }
            cmp @ ("older" | "newer") => {
                if let Some((value, consumed)) = number_after_than(&tokens[i + 1..]) {
                    let after = tokens.get(i + 1 + consumed).map(String::as_str);
                    let factor = after.and_then(unit_factor(AGE_UNITS)).unwrap_or(1.0);
                    let op = if cmp == "older" { ">" } else { "<" };
                    push_predicate(parameters, &mut index, "age_days", op, value * factor);
                    i += 2 + consumed;
                    continue;
                }
            }
            "containing" => {
                let negated = i > 0 && tokens[i - 1] == "not";
                if let Some(value) = tokens.get(i + 1) {
                    let op = if negated { "not_contains" } else { "contains" };
                    parameters.insert(
                        format!("where_{index}_field"),
                        ParamValue::Str("content".into()),
                    );
                    parameters.insert(format!("where_{index}_op"), ParamValue::Str(op.into()));
                    parameters.insert(
                        format!("where_{index}_value"),
                        ParamValue::Str(value.clone()),
                    );
                    index += 1;
                    i += 2;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
}

/// Parse "than <n>" or just "<n>" at the start of a token slice, returning
/// the number and how many tokens it spanned.
fn number_after_than(tokens: &[String]) -> Option<(f64, usize)> {
    match tokens.first().map(String::as_str) {
        Some("than") => tokens.get(1)?.parse::<f64>().ok().map(|n| (n, 2)),
        Some(tok) => tok.parse::<f64>().ok().map(|n| (n, 1)),
        None => None,
    }
}

fn unit_factor(units: &'static [(&'static str, f64)]) -> impl Fn(&str) -> Option<f64> {
    move |tok| units.iter().find(|(u, _)| *u == tok).map(|(_, f)| *f)
}

fn push_predicate(
    parameters: &mut BTreeMap<String, ParamValue>,
    index: &mut usize,
    field: &str,
    op: &str,
    value: f64,
) {
    parameters.insert(format!("where_{index}_field"), ParamValue::Str(field.into()));
    parameters.insert(format!("where_{index}_op"), ParamValue::Str(op.into()));
    parameters.insert(format!("where_{index}_value"), ParamValue::Num(value));
    *index += 1;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polish_find_scenario() {
        let parsed = FileParser
            .parse("znajdź wszystkie pliki txt w katalogu projekty")
            .unwrap();
        assert_eq!(parsed.intent, "find_files");
        assert_eq!(parsed.domain, "file");
        assert_eq!(parsed.get_str("extension"), Some("txt"));
        assert_eq!(parsed.get_str("directory"), Some("projekty"));
        assert!(parsed.confidence >= crate::matcher::MIN_SCORE);
    }

    #[test]
    fn test_english_equivalent_same_intent() {
        let parsed = FileParser
            .parse("find all files txt in directory projekty")
            .unwrap();
        assert_eq!(parsed.intent, "find_files");
        assert_eq!(parsed.get_str("extension"), Some("txt"));
    }

    #[test]
    fn test_size_filter_extracted() {
        let parsed = FileParser
            .parse("znajdź pliki txt większe niż 2 mb w katalogu dane")
            .unwrap();
        assert_eq!(parsed.intent, "find_files");
        assert_eq!(parsed.get_str("where_0_field"), Some("size"));
        assert_eq!(parsed.get_str("where_0_op"), Some(">"));
        assert_eq!(parsed.get_num("where_0_value"), Some(2.0 * 1024.0 * 1024.0));
    }

    #[test]
    fn test_age_filter_extracted() {
        let parsed = FileParser.parse("usuń pliki log starsze niż 2 tygodni").unwrap();
        assert_eq!(parsed.intent, "delete_files");
        assert_eq!(parsed.get_str("where_0_field"), Some("age_days"));
        assert_eq!(parsed.get_str("where_0_op"), Some(">"));
        assert_eq!(parsed.get_num("where_0_value"), Some(14.0));
    }

    #[test]
    fn test_content_filter_extracted() {
        let parsed = FileParser
            .parse("znajdź pliki txt zawierające \"raport\"")
            .unwrap();
        assert_eq!(parsed.get_str("where_0_field"), Some("content"));
        assert_eq!(parsed.get_str("where_0_op"), Some("contains"));
        assert_eq!(parsed.get_str("where_0_value"), Some("raport"));
    }

    #[test]
    fn test_filter_step_parses_without_source() {
        let parsed = FileParser.parse("wybierz te większe niż 10 kb").unwrap();
        assert_eq!(parsed.intent, "filter_files");
        assert_eq!(parsed.get_num("where_0_value"), Some(10.0 * 1024.0));
    }

    #[test]
    fn test_unrecognized_command_fails() {
        let err = FileParser.parse("całkowicie nieznane polecenie").unwrap_err();
        assert!(matches!(err, ProcessError::UnrecognizedIntent { .. }));
    }
}
