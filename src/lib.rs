//! parlance — natural-language command processing.
//!
//! Maps short Polish/English commands to executable operations through a
//! layered pipeline:
//!
//! 1. **Normalization** — case fold, quoted literals, synonym mapping to
//!    canonical tokens (`normalize`)
//! 2. **Pattern matching** — declarative template tables per domain
//!    (`matcher`)
//! 3. **Parsing** — intent + parameters with a confidence (`registry::Parser`)
//! 4. **Translation** — domain commands, with fuzzy schema resolution for
//!    the SQL domain (`registry::Translator`, `fuzzy`)
//! 5. **Execution** — uniform CommandResults (`registry::Executor`)
//! 6. **Pipelines** — fluent chaining with a single ordered execution pass
//!    (`pipeline`)
//!
//! Domains plug in as Parser/Translator/Executor triples through the
//! `DomainRegistry`; `files` and `sql` ship in-tree. The `Processor` is the
//! front door: `process` for single commands, `create_pipeline` for
//! multi-line specifications.

pub mod codegen;
pub mod files;
pub mod fuzzy;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod sql;
pub mod trace;
pub mod types;

pub use pipeline::{Pipeline, PipelineOutcome, StepTrace};
pub use processor::Processor;
pub use registry::{DomainRegistry, Executor, Parser, Translator};
pub use types::{
    CommandResult, DomainCommand, ParamValue, ParseResult, ProcessError, Result, ResultData,
};
