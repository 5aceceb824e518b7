//! The processing entrypoint: text → parse → translate → execute.
//!
//! A Processor owns the domain registry and drives single commands
//! (`process`) and multi-line pipeline builds (`create_pipeline`).
//!
//! Domain selection policy: an explicit domain argument always wins. With
//! no domain given, every registered domain's parser is tried and the
//! highest-confidence ParseResult is used; ties break by domain
//! registration order. Deterministic by construction.

use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::registry::DomainRegistry;
use crate::types::{
    CommandResult, DomainCommand, ParseResult, ProcessError, Result, ResultData,
};

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Integrates parser, translator, and executor lookups behind one entry
/// point. Single-threaded: processing is synchronous and sequential.
#[derive(Default)]
pub struct Processor {
    registry: DomainRegistry,
    history: Vec<String>,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: DomainRegistry) -> Self {
        Self {
            registry,
            history: Vec::new(),
        }
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DomainRegistry {
        &mut self.registry
    }

    /// Commands processed so far, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    // -----------------------------------------------------------------------
    // Single-command processing
    // -----------------------------------------------------------------------

    /// Process one natural-language command end to end.
    ///
    /// Parse and translate failures (unrecognized intent, unresolvable
    /// schema token, bad parameter, unknown domain) return `Err` and abort
    /// before any side effect. Domain-level runtime failures (file not
    /// found, SQL engine error) return `Ok` with `success: false`.
    pub fn process(&mut self, text: &str, domain: Option<&str>) -> Result<CommandResult> {
        self.history.push(text.to_string());

        let (parsed, command) = self.analyze(text, domain)?;
        let (_, _, executor) = self.registry.triple(&parsed.domain)?;

        tracing::debug!(
            domain = %parsed.domain,
            intent = %parsed.intent,
            confidence = parsed.confidence,
            command = %command.rendered,
            "executing command"
        );

        executor.execute(&command, &ResultData::None)
    }

    /// Parse and translate without executing. This is the shared front half
    /// of `process` and the debug entrypoints.
    pub fn analyze(
        &self,
        text: &str,
        domain: Option<&str>,
    ) -> Result<(ParseResult, DomainCommand)> {
        let parsed = match domain {
            Some(d) => {
                let (parser, _, _) = self.registry.triple(d)?;
                parser.parse(text)?
            }
            None => self.detect_domain(text)?,
        };

        let (_, translator, _) = self.registry.triple(&parsed.domain)?;
        let command = translator.translate(&parsed)?;
        Ok((parsed, command))
    }

    /// Try every registered domain's parser; the highest confidence wins,
    /// ties keeping registration order.
    fn detect_domain(&self, text: &str) -> Result<ParseResult> {
        let mut best: Option<ParseResult> = None;

        for domain in self.registry.domains() {
            let (parser, _, _) = self.registry.triple(domain)?;
            match parser.parse(text) {
                Ok(parsed) => {
                    let better = best
                        .as_ref()
                        .map(|b| parsed.confidence > b.confidence)
                        .unwrap_or(true);
                    if better {
                        best = Some(parsed);
                    }
                }
                Err(ProcessError::UnrecognizedIntent { .. }) => continue,
                Err(other) => return Err(other),
            }
        }

        best.ok_or_else(|| ProcessError::UnrecognizedIntent {
            domain: "auto".to_string(),
            text: text.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Pipelines from natural language
    // -----------------------------------------------------------------------

    /// Build a pipeline from a multi-line specification: one command per
    /// line, optional numbering ("1.", "2)") or bullets stripped.
    ///
    /// Construction is all-or-nothing: if any line fails to parse or
    /// translate, the whole build fails with `PipelineBuild` carrying the
    /// 1-based index of the offending command line, and nothing executes.
    pub fn create_pipeline(&self, text: &str) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new();
        let mut line_no = 0usize;

        for raw_line in text.lines() {
            let line = strip_numbering(raw_line.trim());
            if line.is_empty() {
                continue;
            }
            line_no += 1;

            let (_, command) =
                self.analyze(line, None)
                    .map_err(|e| ProcessError::PipelineBuild {
                        line: line_no,
                        source: Box::new(e),
                    })?;

            pipeline = pipeline.then_from(line, command);
        }

        tracing::debug!(steps = pipeline.len(), "pipeline built");
        Ok(pipeline)
    }

    /// Execute a pipeline against this processor's registry.
    pub fn execute_pipeline(
        &self,
        pipeline: &Pipeline,
        initial: ResultData,
    ) -> Result<PipelineOutcome> {
        pipeline.execute(&self.registry, initial)
    }
}

/// Strip leading list numbering ("1. ", "2) ") or bullets ("- ", "* ").
fn strip_numbering(line: &str) -> &str {
    let trimmed = line.trim_start();

    if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        return rest.trim_start();
    }

    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let after = &trimmed[digits..];
        if let Some(rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            return rest.trim_start();
        }
    }

    trimmed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Executor, Parser, Translator};
    use crate::types::InputMode;
    use std::collections::BTreeMap;

    // A parser that recognizes lines starting with its magic word, with
    // confidence proportional to how early the word appears.
    struct WordParser {
        domain: &'static str,
        word: &'static str,
        confidence: f64,
    }
    struct EchoTranslator;
    struct EchoExecutor;

    impl Parser for WordParser {
        fn parse(&self, text: &str) -> Result<ParseResult> {
            if text.contains(self.word) {
                Ok(ParseResult {
                    intent: self.word.to_string(),
                    domain: self.domain.to_string(),
                    parameters: BTreeMap::new(),
                    confidence: self.confidence,
                    source_text: text.to_string(),
                })
            } else {
                Err(ProcessError::UnrecognizedIntent {
                    domain: self.domain.to_string(),
                    text: text.to_string(),
                })
            }
        }
    }

    impl Translator for EchoTranslator {
        fn translate(&self, parsed: &ParseResult) -> Result<DomainCommand> {
            Ok(DomainCommand {
                domain: parsed.domain.clone(),
                operation: parsed.intent.clone(),
                args: vec![],
                predicates: vec![],
                input_mode: InputMode::Independent,
                rendered: format!("{}()", parsed.intent),
            })
        }
    }

    impl Executor for EchoExecutor {
        fn execute(&self, command: &DomainCommand, _input: &ResultData) -> Result<CommandResult> {
            Ok(CommandResult::ok(ResultData::Text(command.domain.clone())))
        }
    }

    fn processor() -> Processor {
        let mut p = Processor::new();
        p.registry_mut().register_domain(
            "alpha",
            Box::new(WordParser {
                domain: "alpha",
                word: "alfa",
                confidence: 0.8,
            }),
            Box::new(EchoTranslator),
            Box::new(EchoExecutor),
        );
        p.registry_mut().register_domain(
            "beta",
            Box::new(WordParser {
                domain: "beta",
                word: "beta",
                confidence: 0.9,
            }),
            Box::new(EchoTranslator),
            Box::new(EchoExecutor),
        );
        p
    }

    #[test]
    fn test_explicit_domain_overrides_detection() {
        let mut p = processor();
        // both words present; explicit choice must win over higher confidence
        let result = p.process("alfa beta", Some("alpha")).unwrap();
        assert_eq!(result.data, ResultData::Text("alpha".into()));
    }

    #[test]
    fn test_auto_detection_picks_highest_confidence() {
        let mut p = processor();
        let result = p.process("alfa beta", None).unwrap();
        assert_eq!(result.data, ResultData::Text("beta".into()));
    }

    #[test]
    fn test_unknown_domain_fails_before_parsing() {
        let mut p = processor();
        assert!(matches!(
            p.process("alfa", Some("gamma")),
            Err(ProcessError::DomainNotRegistered { .. })
        ));
    }

    #[test]
    fn test_nothing_recognized_is_unrecognized_intent() {
        let mut p = processor();
        assert!(matches!(
            p.process("gamma delta", None),
            Err(ProcessError::UnrecognizedIntent { .. })
        ));
    }

    #[test]
    fn test_pipeline_build_reports_failing_line() {
        let p = processor();
        let text = "1. alfa first\n2. gamma nonsense\n3. beta last";
        let err = p.create_pipeline(text).unwrap_err();
        match err {
            ProcessError::PipelineBuild { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pipeline_build_strips_numbering() {
        let p = processor();
        let text = "1. alfa one\n2) beta two\n- alfa three";
        let pipeline = p.create_pipeline(text).unwrap();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.steps()[0].source_text, "alfa one");
        assert_eq!(pipeline.steps()[1].source_text, "beta two");
    }

    #[test]
    fn test_history_records_commands() {
        let mut p = processor();
        let _ = p.process("alfa", None);
        let _ = p.process("beta", None);
        assert_eq!(p.history(), ["alfa", "beta"]);
    }
}
