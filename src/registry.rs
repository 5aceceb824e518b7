//! Domain registry: the Parser / Translator / Executor polymorphic contract.
//!
//! Each domain (file, sql, ...) plugs in one implementation of each of the
//! three roles. Registration is explicit — no discovery — and the last
//! registration for a domain wins, which is what makes test doubles and
//! plugin overrides possible. Looking up an incomplete triple fails with
//! `DomainNotRegistered` naming the missing role, before any parsing runs.
//!
//! The registry is read-mostly state: built at startup, then only read.
//! No internal locking; a caller must not swap an entry while a pipeline
//! referencing it is executing.

use std::collections::HashMap;

use crate::types::{CommandResult, DomainCommand, ParseResult, ProcessError, Result, ResultData};

// ---------------------------------------------------------------------------
// The three roles
// ---------------------------------------------------------------------------

/// Turns raw text into a ParseResult. Fails with `UnrecognizedIntent` when
/// no pattern matches above the minimum score.
pub trait Parser {
    fn parse(&self, text: &str) -> Result<ParseResult>;
}

/// Turns a ParseResult into a DomainCommand. Fails with
/// `SchemaResolution` or `InvalidParameter` when required parameters are
/// missing, malformed, or unresolvable.
pub trait Translator {
    fn translate(&self, parsed: &ParseResult) -> Result<DomainCommand>;
}

/// Runs a DomainCommand. `input` is the previous pipeline step's data
/// (`ResultData::None` for standalone processing). Expected domain failures
/// return `success: false`; only hard failures propagate as `Err`.
pub trait Executor {
    fn execute(&self, command: &DomainCommand, input: &ResultData) -> Result<CommandResult>;
}

// ---------------------------------------------------------------------------
// DomainRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DomainEntry {
    parser: Option<Box<dyn Parser>>,
    translator: Option<Box<dyn Translator>>,
    executor: Option<Box<dyn Executor>>,
}

/// Maps domain name → (Parser, Translator, Executor).
#[derive(Default)]
pub struct DomainRegistry {
    entries: HashMap<String, DomainEntry>,
    /// Domain names in first-registration order; the tie-break order for
    /// auto-detection.
    order: Vec<String>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_parser(&mut self, domain: &str, parser: Box<dyn Parser>) {
        self.entry(domain).parser = Some(parser);
    }

    pub fn register_translator(&mut self, domain: &str, translator: Box<dyn Translator>) {
        self.entry(domain).translator = Some(translator);
    }

    pub fn register_executor(&mut self, domain: &str, executor: Box<dyn Executor>) {
        self.entry(domain).executor = Some(executor);
    }

    /// Install all three roles at once — the validated registration path.
    pub fn register_domain(
        &mut self,
        domain: &str,
        parser: Box<dyn Parser>,
        translator: Box<dyn Translator>,
        executor: Box<dyn Executor>,
    ) {
        let entry = self.entry(domain);
        entry.parser = Some(parser);
        entry.translator = Some(translator);
        entry.executor = Some(executor);
    }

    fn entry(&mut self, domain: &str) -> &mut DomainEntry {
        if !self.entries.contains_key(domain) {
            self.order.push(domain.to_string());
        }
        self.entries.entry(domain.to_string()).or_default()
    }

    /// Fetch the complete triple for a domain, or fail naming what is
    /// missing. This runs before any parsing, so an unknown domain can
    /// never cause a side effect.
    pub fn triple(&self, domain: &str) -> Result<(&dyn Parser, &dyn Translator, &dyn Executor)> {
        let entry = self
            .entries
            .get(domain)
            .ok_or_else(|| ProcessError::DomainNotRegistered {
                domain: domain.to_string(),
                missing: "parser, translator, or executor",
            })?;

        let parser = entry
            .parser
            .as_deref()
            .ok_or_else(|| ProcessError::DomainNotRegistered {
                domain: domain.to_string(),
                missing: "parser",
            })?;
        let translator =
            entry
                .translator
                .as_deref()
                .ok_or_else(|| ProcessError::DomainNotRegistered {
                    domain: domain.to_string(),
                    missing: "translator",
                })?;
        let executor = entry
            .executor
            .as_deref()
            .ok_or_else(|| ProcessError::DomainNotRegistered {
                domain: domain.to_string(),
                missing: "executor",
            })?;

        Ok((parser, translator, executor))
    }

    /// Domain names with complete triples, in first-registration order.
    pub fn domains(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|d| self.triple(d).is_ok())
            .map(|d| d.as_str())
            .collect()
    }

    pub fn is_registered(&self, domain: &str) -> bool {
        self.triple(domain).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
