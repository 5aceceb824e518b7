use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Parameter values — the "currency" extracted from natural language
// ---------------------------------------------------------------------------

/// A parameter value extracted from a command: either free text or a number.
/// Numbers are kept as f64 so "10", "2.5" and size arithmetic share one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Num(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Num(_) => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Integral values print without a trailing ".0" so rendered
            // commands read "limit=10", not "limit=10.0".
            Self::Num(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Num(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

// ---------------------------------------------------------------------------
// ParseResult — the intermediate representation between Parser and Translator
// ---------------------------------------------------------------------------

/// What a Parser produces from raw text: a recognized intent, the domain it
/// belongs to, the extracted parameters, and a confidence in [0, 1].
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub intent: String,
    pub domain: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub confidence: f64,
    /// The original input, carried for diagnostics and traces.
    pub source_text: String,
}

impl ParseResult {
    /// Fetch a required string parameter, or fail with `InvalidParameter`.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.parameters
            .get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProcessError::InvalidParameter {
                intent: self.intent.clone(),
                name: name.to_string(),
                reason: "required text parameter is missing".to_string(),
            })
    }

    /// Fetch a required numeric parameter, or fail with `InvalidParameter`.
    pub fn require_num(&self, name: &str) -> Result<f64> {
        self.parameters
            .get(name)
            .and_then(|v| v.as_num())
            .ok_or_else(|| ProcessError::InvalidParameter {
                intent: self.intent.clone(),
                name: name.to_string(),
                reason: "required numeric parameter is missing or not a number".to_string(),
            })
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(|v| v.as_str())
    }

    pub fn get_num(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).and_then(|v| v.as_num())
    }
}

// ---------------------------------------------------------------------------
// Predicates — structured filters carried on a DomainCommand
// ---------------------------------------------------------------------------

/// Comparison operator in a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    Contains,
    NotContains,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
        };
        write!(f, "{}", s)
    }
}

/// A single filter condition: field, comparison, value.
/// File-domain fields are "size" / "age_days" / "content"; SQL-domain
/// fields are resolved column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: CmpOp,
    pub value: ParamValue,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CmpOp, value: impl Into<ParamValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

// ---------------------------------------------------------------------------
// DomainCommand — the translated, executable instruction
// ---------------------------------------------------------------------------

/// Whether a pipeline step consumes the previous step's output or starts
/// from its own declared source (e.g. "find files in X").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Consumes,
    Independent,
}

/// The Translator's output: a read-only instruction for an Executor.
///
/// `args` preserves named arguments in build order; `predicates` carries
/// structured filters; `rendered` is the canonical textual form (a DSL call
/// for file operations, the query text for SQL) and references every
/// extracted parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainCommand {
    pub domain: String,
    pub operation: String,
    pub args: Vec<(String, ParamValue)>,
    pub predicates: Vec<Predicate>,
    pub input_mode: InputMode,
    pub rendered: String,
}

impl DomainCommand {
    pub fn arg(&self, name: &str) -> Option<&ParamValue> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(|v| v.as_str())
    }

    pub fn arg_num(&self, name: &str) -> Option<f64> {
        self.arg(name).and_then(|v| v.as_num())
    }
}

impl fmt::Display for DomainCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.domain, self.rendered)
    }
}

// ---------------------------------------------------------------------------
// CommandResult — the uniform result envelope
// ---------------------------------------------------------------------------

/// The payload of a CommandResult, threaded between pipeline steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultData {
    None,
    Text(String),
    /// A flat list of items (file paths, names).
    List(Vec<String>),
    /// Tabular rows: column name → value.
    Records(Vec<BTreeMap<String, ParamValue>>),
    /// A count of affected/created/removed items.
    Count(u64),
}

impl ResultData {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Number of items carried, for trace summaries.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Text(_) => 1,
            Self::List(items) => items.len(),
            Self::Records(rows) => rows.len(),
            Self::Count(n) => *n as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Uniform result of every Executor invocation. Expected domain failures
/// (file not found, SQL engine error) come back as `success: false` with a
/// populated `error`; they are never raised. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub data: ResultData,
    pub error: Option<String>,
    /// The generated SQL text, when the SQL domain produced this result.
    pub sql: Option<String>,
    /// Raw backend output, when distinct from `data`.
    pub raw_output: Option<String>,
}

impl CommandResult {
    pub fn ok(data: ResultData) -> Self {
        Self {
            success: true,
            data,
            error: None,
            sql: None,
            raw_output: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: ResultData::None,
            error: Some(error.into()),
            sql: None,
            raw_output: None,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw_output = Some(raw.into());
        self
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "ok ({} items)", self.data.len())
        } else {
            write!(f, "failed: {}", self.error.as_deref().unwrap_or("unknown"))
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// No pattern matched the input above the minimum score threshold.
    #[error("unrecognized command in domain '{domain}': {text:?}")]
    UnrecognizedIntent { domain: String, text: String },

    /// A token could not be fuzzy-matched against the schema. The closest
    /// rejected candidate and its score are carried for diagnostics.
    #[error("cannot resolve '{token}' against the schema")]
    SchemaResolution {
        token: String,
        best_candidate: Option<String>,
        best_score: f64,
    },

    /// A required parameter was missing or malformed for the given intent.
    #[error("invalid parameter '{name}' for intent '{intent}': {reason}")]
    InvalidParameter {
        intent: String,
        name: String,
        reason: String,
    },

    /// The requested domain has no complete Parser/Translator/Executor triple.
    #[error("domain '{domain}' has no registered {missing}")]
    DomainNotRegistered {
        domain: String,
        missing: &'static str,
    },

    /// Pipeline construction failed on one line; nothing was executed.
    #[error("pipeline build failed at line {line}: {source}")]
    PipelineBuild {
        line: usize,
        #[source]
        source: Box<ProcessError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pattern table error: {0}")]
    PatternTable(String),
}

pub type Result<T> = std::result::Result<T, ProcessError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::Num(10.0).to_string(), "10");
        assert_eq!(ParamValue::Num(2.5).to_string(), "2.5");
        assert_eq!(ParamValue::Str("txt".into()).to_string(), "txt");
    }

    #[test]
    fn test_param_value_coercion() {
        assert_eq!(ParamValue::Str("42".into()).as_num(), Some(42.0));
        assert_eq!(ParamValue::Str("projekty".into()).as_num(), None);
        assert_eq!(ParamValue::Num(7.0).as_str(), None);
    }

    #[test]
    fn test_command_result_constructors() {
        let ok = CommandResult::ok(ResultData::List(vec!["a.txt".into()]));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = CommandResult::fail("directory not found");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("directory not found"));
        assert!(failed.data.is_none());
    }

    #[test]
    fn test_domain_command_arg_lookup() {
        let cmd = DomainCommand {
            domain: "file".into(),
            operation: "find".into(),
            args: vec![
                ("pattern".into(), "*.txt".into()),
                ("path".into(), "projekty".into()),
            ],
            predicates: vec![],
            input_mode: InputMode::Independent,
            rendered: "find(pattern=\"*.txt\", path=\"projekty\")".into(),
        };
        assert_eq!(cmd.arg_str("pattern"), Some("*.txt"));
        assert_eq!(cmd.arg_str("missing"), None);
    }
}
