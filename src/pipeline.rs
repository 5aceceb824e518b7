//! Fluent command pipelines.
//!
//! A Pipeline accumulates translated DomainCommands (possibly across
//! domains) through chained builder calls and executes them in a single
//! pass, strictly in append order. Each step receives the previous step's
//! `CommandResult.data` unless its command declares itself
//! input-independent. Execution halts at the first failed step; the
//! pipeline's overall result is that failing CommandResult plus the index
//! of the failing step.
//!
//! The builder consumes and returns `self`, so a pipeline is owned by
//! exactly one handle; fork a variant by cloning before the split.

use crate::registry::DomainRegistry;
use crate::types::{CommandResult, DomainCommand, InputMode, Result, ResultData};

// ---------------------------------------------------------------------------
// Steps and traces
// ---------------------------------------------------------------------------

/// One element of a pipeline: a translated command plus its origin.
#[derive(Debug, Clone)]
pub struct PipelineStep {
    /// 0-based position in the pipeline; also the execution order.
    pub index: usize,
    /// The natural-language line this step came from (or the rendered
    /// command when built programmatically).
    pub source_text: String,
    pub command: DomainCommand,
}

/// What happened at one step of an execution pass.
#[derive(Debug, Clone)]
pub struct StepTrace {
    pub index: usize,
    pub source_text: String,
    pub rendered: String,
    pub success: bool,
    /// Items carried in the step's result data.
    pub items: usize,
    pub error: Option<String>,
}

/// The overall outcome of one execution pass.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The last executed step's result — the failing one when `failed_step`
    /// is set, otherwise the final step's.
    pub result: CommandResult,
    /// Index of the step that failed, when execution halted early.
    pub failed_step: Option<usize>,
    /// Per-step execution trace, in order.
    pub trace: Vec<StepTrace>,
}

impl PipelineOutcome {
    pub fn success(&self) -> bool {
        self.failed_step.is_none() && self.result.success
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered, append-only chain of translated commands.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command, using its rendered form as the source text.
    /// Returns the pipeline for further chaining.
    pub fn then(self, command: DomainCommand) -> Self {
        let source = command.rendered.clone();
        self.then_from(source, command)
    }

    /// Append a command with the natural-language line it came from.
    pub fn then_from(mut self, source_text: impl Into<String>, command: DomainCommand) -> Self {
        self.steps.push(PipelineStep {
            index: self.steps.len(),
            source_text: source_text.into(),
            command,
        });
        self
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run all steps in append order against the registered executors.
    ///
    /// `initial` seeds the first step's input. A step whose command is
    /// `InputMode::Independent` ignores the incoming data (it declares its
    /// own source); all others consume the previous step's `data`.
    ///
    /// Returns `Err` only for hard failures (unregistered domain mid-chain,
    /// I/O exhaustion). Expected step failures halt execution and are
    /// reported in the outcome.
    pub fn execute(&self, registry: &DomainRegistry, initial: ResultData) -> Result<PipelineOutcome> {
        let mut trace = Vec::with_capacity(self.steps.len());
        let mut data = initial;
        let mut last_result = CommandResult::ok(ResultData::None);

        for step in &self.steps {
            let (_, _, executor) = registry.triple(&step.command.domain)?;

            let input = match step.command.input_mode {
                InputMode::Independent => ResultData::None,
                InputMode::Consumes => std::mem::replace(&mut data, ResultData::None),
            };

            tracing::debug!(
                step = step.index,
                domain = %step.command.domain,
                command = %step.command.rendered,
                "executing pipeline step"
            );

            let result = executor.execute(&step.command, &input)?;

            trace.push(StepTrace {
                index: step.index,
                source_text: step.source_text.clone(),
                rendered: step.command.rendered.clone(),
                success: result.success,
                items: result.data.len(),
                error: result.error.clone(),
            });

            if !result.success {
                tracing::debug!(step = step.index, "pipeline halted on failed step");
                return Ok(PipelineOutcome {
                    result,
                    failed_step: Some(step.index),
                    trace,
                });
            }

            data = result.data.clone();
            last_result = result;
        }

        Ok(PipelineOutcome {
            result: last_result,
            failed_step: None,
            trace,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Executor, Parser, Translator};
    use crate::types::{ParseResult, ProcessError};
    use std::collections::BTreeMap;

    // A toy domain: "emit" produces a list, "take" keeps the first N items
    // of its input, "boom" always fails.
    struct ToyParser;
    struct ToyTranslator;
    struct ToyExecutor;

    impl Parser for ToyParser {
        fn parse(&self, text: &str) -> Result<ParseResult> {
            Ok(ParseResult {
                intent: text.to_string(),
                domain: "toy".into(),
                parameters: BTreeMap::new(),
                confidence: 1.0,
                source_text: text.to_string(),
            })
        }
    }

    impl Translator for ToyTranslator {
        fn translate(&self, parsed: &ParseResult) -> Result<DomainCommand> {
            Ok(cmd(&parsed.intent, InputMode::Independent))
        }
    }

    fn cmd(op: &str, input_mode: InputMode) -> DomainCommand {
        DomainCommand {
            domain: "toy".into(),
            operation: op.into(),
            args: vec![],
            predicates: vec![],
            input_mode,
            rendered: format!("{op}()"),
        }
    }

    impl Executor for ToyExecutor {
        fn execute(&self, command: &DomainCommand, input: &ResultData) -> Result<CommandResult> {
            match command.operation.as_str() {
                "emit" => Ok(CommandResult::ok(ResultData::List(vec![
                    "a".into(),
                    "b".into(),
                    "c".into(),
                ]))),
                "take2" => match input {
                    ResultData::List(items) => Ok(CommandResult::ok(ResultData::List(
                        items.iter().take(2).cloned().collect(),
                    ))),
                    _ => Ok(CommandResult::fail("take2 needs a list input")),
                },
                "boom" => Ok(CommandResult::fail("boom failed as designed")),
                other => Ok(CommandResult::fail(format!("unknown op {other}"))),
            }
        }
    }

    fn registry() -> DomainRegistry {
        let mut reg = DomainRegistry::new();
        reg.register_domain(
            "toy",
            Box::new(ToyParser),
            Box::new(ToyTranslator),
            Box::new(ToyExecutor),
        );
        reg
    }

    #[test]
    fn test_data_threads_between_steps() {
        let reg = registry();
        let pipeline = Pipeline::new()
            .then(cmd("emit", InputMode::Independent))
            .then(cmd("take2", InputMode::Consumes));

        let outcome = pipeline.execute(&reg, ResultData::None).unwrap();
        assert!(outcome.success());
        assert_eq!(
            outcome.result.data,
            ResultData::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(outcome.trace.len(), 2);
    }

    #[test]
    fn test_halts_at_first_failure_with_index() {
        let reg = registry();
        let pipeline = Pipeline::new()
            .then(cmd("emit", InputMode::Independent))
            .then(cmd("boom", InputMode::Consumes))
            .then(cmd("take2", InputMode::Consumes));

        let outcome = pipeline.execute(&reg, ResultData::None).unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.failed_step, Some(1));
        // the third step never ran
        assert_eq!(outcome.trace.len(), 2);
        assert_eq!(
            outcome.result.error.as_deref(),
            Some("boom failed as designed")
        );
    }

    #[test]
    fn test_independent_step_ignores_input() {
        let reg = registry();
        let pipeline = Pipeline::new()
            .then(cmd("emit", InputMode::Independent))
            // emit again: declares its own source, prior data irrelevant
            .then(cmd("emit", InputMode::Independent));

        let outcome = pipeline.execute(&reg, ResultData::None).unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.result.data.len(), 3);
    }

    #[test]
    fn test_unregistered_domain_is_hard_error() {
        let reg = registry();
        let mut foreign = cmd("emit", InputMode::Independent);
        foreign.domain = "nope".into();
        let pipeline = Pipeline::new().then(foreign);

        assert!(matches!(
            pipeline.execute(&reg, ResultData::None),
            Err(ProcessError::DomainNotRegistered { .. })
        ));
    }

    #[test]
    fn test_execution_is_repeatable() {
        let reg = registry();
        let pipeline = Pipeline::new()
            .then(cmd("emit", InputMode::Independent))
            .then(cmd("take2", InputMode::Consumes));

        let first = pipeline.execute(&reg, ResultData::None).unwrap();
        let second = pipeline.execute(&reg, ResultData::None).unwrap();
        assert_eq!(first.result.data, second.result.data);
        assert_eq!(first.trace.len(), second.trace.len());
    }
}
