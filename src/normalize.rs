//! Text normalization for incoming commands.
//!
//! Pipeline: raw input → case fold → quoted-literal extraction →
//! punctuation strip → synonym mapping → stopword removal.
//!
//! Synonym mapping rewrites Polish and English surface forms to a single
//! canonical token vocabulary ("znajdź"/"szukaj"/"search" → "find"), so the
//! pattern tables are written once, over canonical tokens. Quoted strings
//! survive as single literal tokens with their original case and spacing.
//!
//! All transforms are pure; the vocabulary is process-wide read-only state
//! loaded once from YAML.

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Embedded fallback
// ---------------------------------------------------------------------------

const EMBEDDED_VOCAB: &str = include_str!("../data/vocab.yaml");

// ---------------------------------------------------------------------------
// NormalizedInput — the output of normalization
// ---------------------------------------------------------------------------

/// Result of normalizing a raw command string.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    /// The original raw input, untouched.
    pub raw: String,
    /// Tokens after case fold + quote handling + punctuation strip.
    pub tokens: Vec<String>,
    /// Tokens after synonym mapping and stopword removal.
    pub canonical_tokens: Vec<String>,
}

// ---------------------------------------------------------------------------
// Vocabulary — YAML schema and loaded form
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VocabYaml {
    synonyms: Vec<SynonymEntry>,
    stopwords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SynonymEntry {
    phrase: Vec<String>,
    canonical: Vec<String>,
}

/// Loaded vocabulary, indexed for lookup.
#[derive(Debug)]
pub struct Vocab {
    /// (surface phrase tokens, canonical replacement tokens), longest
    /// phrase first so multi-word synonyms win over their prefixes.
    synonyms: Vec<(Vec<String>, Vec<String>)>,
    stopwords: HashSet<String>,
}

static VOCAB: OnceLock<Vocab> = OnceLock::new();

/// The process-wide vocabulary (loaded on first use).
pub fn vocab() -> &'static Vocab {
    VOCAB.get_or_init(load_vocab)
}

fn load_vocab() -> Vocab {
    // Disk-first, embedded fallback
    let yaml_str = std::fs::read_to_string("data/vocab.yaml")
        .ok()
        .unwrap_or_else(|| EMBEDDED_VOCAB.to_string());

    parse_vocab(&yaml_str).unwrap_or_else(|e| {
        tracing::warn!("failed to parse data/vocab.yaml from disk ({e}), using embedded");
        parse_vocab(EMBEDDED_VOCAB).expect("embedded vocab.yaml must parse")
    })
}

fn parse_vocab(yaml_str: &str) -> Result<Vocab, String> {
    let raw: VocabYaml =
        serde_yaml::from_str(yaml_str).map_err(|e| format!("YAML parse error: {}", e))?;

    let mut synonyms: Vec<(Vec<String>, Vec<String>)> = raw
        .synonyms
        .into_iter()
        .map(|e| (e.phrase, e.canonical))
        .collect();
    synonyms.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    Ok(Vocab {
        synonyms,
        stopwords: raw.stopwords.into_iter().collect(),
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Normalize a raw command string through the full pipeline.
pub fn normalize(input: &str) -> NormalizedInput {
    let tokens = tokenize(input);
    let canonical_tokens = canonicalize(&tokens, vocab());

    NormalizedInput {
        raw: input.to_string(),
        tokens,
        canonical_tokens,
    }
}

// ---------------------------------------------------------------------------
// Tokenization
// ---------------------------------------------------------------------------

/// Split input into tokens. Quoted segments ("moje pliki", 'backup 2024')
/// become single literal tokens preserving case and spaces; everything else
/// is lowercased and stripped of surrounding punctuation.
fn tokenize(input: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut segment = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' {
            if !segment.is_empty() {
                tokenize_segment(&segment, &mut result);
                segment.clear();
            }
            let mut quoted = String::new();
            for qc in chars.by_ref() {
                if qc == c {
                    break;
                }
                quoted.push(qc);
            }
            if !quoted.is_empty() {
                result.push(quoted);
            }
        } else {
            segment.push(c);
        }
    }
    if !segment.is_empty() {
        tokenize_segment(&segment, &mut result);
    }

    result
}

/// Tokenize an unquoted segment: lowercase, split on whitespace, strip
/// surrounding punctuation. Path-like and glob tokens (`~/docs`, `*.txt`)
/// keep their internal punctuation; comparison symbols survive as tokens.
fn tokenize_segment(segment: &str, out: &mut Vec<String>) {
    for word in segment.to_lowercase().split_whitespace() {
        let stripped = strip_punctuation(word);
        if !stripped.is_empty() {
            out.push(stripped);
        }
    }
}

fn strip_punctuation(word: &str) -> String {
    // Glob and path tokens pass through with only trailing commas removed.
    if word.contains('*') || word.contains('/') || word.starts_with('~') {
        return word.trim_end_matches([',', ';']).to_string();
    }
    word.trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '(' | ')' | '[' | ']'))
        .to_string()
}

// ---------------------------------------------------------------------------
// Synonym mapping + stopword removal
// ---------------------------------------------------------------------------

/// Apply the synonym table (longest phrase first, left to right), then drop
/// stopwords. Multi-word literal tokens (from quotes) are never rewritten.
fn canonicalize(tokens: &[String], vocab: &Vocab) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    'outer: while i < tokens.len() {
        if !tokens[i].contains(' ') {
            for (phrase, replacement) in &vocab.synonyms {
                if phrase_matches(tokens, i, phrase) {
                    out.extend(replacement.iter().cloned());
                    i += phrase.len();
                    continue 'outer;
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }

    out.retain(|t| !vocab.stopwords.contains(t));
    out
}

fn phrase_matches(tokens: &[String], at: usize, phrase: &[String]) -> bool {
    tokens.len() >= at + phrase.len()
        && phrase.iter().zip(&tokens[at..]).all(|(p, t)| p == t)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polish_find_command_canonicalizes() {
        let n = normalize("Znajdź wszystkie pliki txt w katalogu projekty");
        assert_eq!(
            n.canonical_tokens,
            vec!["find", "all", "files", "txt", "in", "directory", "projekty"]
        );
    }

    #[test]
    fn test_polish_sql_command_canonicalizes() {
        let n = normalize("pokaż 10 najlepszych klientów z największą sumą zamówień");
        assert_eq!(
            n.canonical_tokens,
            vec!["show", "10", "top", "klientów", "with", "largest", "sum", "zamówień"]
        );
    }

    #[test]
    fn test_quoted_literal_survives() {
        let n = normalize("skopiuj do \"Moje Dokumenty\"");
        assert!(n.tokens.contains(&"Moje Dokumenty".to_string()));
        assert!(n.canonical_tokens.contains(&"Moje Dokumenty".to_string()));
    }

    #[test]
    fn test_glob_token_untouched() {
        let n = normalize("znajdź *.txt w projekty");
        assert!(n.canonical_tokens.contains(&"*.txt".to_string()));
    }

    #[test]
    fn test_multiword_comparison_maps() {
        let n = normalize("wybierz te większe niż 10 kb");
        assert_eq!(
            n.canonical_tokens,
            vec!["filter", "larger", "than", "10", "kb"]
        );
    }

    #[test]
    fn test_punctuation_stripped() {
        let n = normalize("znajdź pliki, proszę!");
        assert_eq!(n.canonical_tokens, vec!["find", "files"]);
    }
}
