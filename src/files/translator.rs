//! Translator for file-operation commands.
//!
//! Turns a ParseResult into an immutable file-op DomainCommand: operation
//! name, named arguments, structured predicates, input mode, and a DSL
//! rendering like `find(pattern="*.txt", path="projekty").where(size >
//! 1048576)`. The rendering references every extracted parameter.

use crate::registry::Translator;
use crate::types::{
    CmpOp, DomainCommand, InputMode, ParamValue, ParseResult, Predicate, ProcessError, Result,
};

use super::DOMAIN;

pub struct FileTranslator;

impl Translator for FileTranslator {
    fn translate(&self, parsed: &ParseResult) -> Result<DomainCommand> {
        let predicates = collect_predicates(parsed)?;

        let (operation, args, input_mode) = match parsed.intent.as_str() {
            "find_files" => {
                let pattern = file_pattern(parsed);
                let path = parsed.get_str("directory").unwrap_or(".").to_string();
                (
                    "find",
                    vec![
                        ("pattern".to_string(), ParamValue::Str(pattern)),
                        ("path".to_string(), ParamValue::Str(path)),
                    ],
                    InputMode::Independent,
                )
            }
            "list_files" => {
                let path = parsed.get_str("directory").unwrap_or(".").to_string();
                (
                    "list",
                    vec![("path".to_string(), ParamValue::Str(path))],
                    InputMode::Independent,
                )
            }
            "create_file" => {
                let name = parsed.require_str("name")?.to_string();
                let mut args = vec![("name".to_string(), ParamValue::Str(name))];
                if let Some(dir) = parsed.get_str("directory") {
                    args.push(("path".to_string(), ParamValue::Str(dir.to_string())));
                }
                ("create", args, InputMode::Independent)
            }
            "create_directory" => {
                let name = parsed.require_str("name")?.to_string();
                (
                    "mkdir",
                    vec![("name".to_string(), ParamValue::Str(name))],
                    InputMode::Independent,
                )
            }
            "delete_files" => source_or_piped(parsed, "delete"),
            "copy_files" => {
                let destination = parsed.require_str("destination")?.to_string();
                let (op, mut args, mode) = source_or_piped(parsed, "copy");
                args.push(("to".to_string(), ParamValue::Str(destination)));
                (op, args, mode)
            }
            "move_files" => {
                let destination = parsed.require_str("destination")?.to_string();
                let (op, mut args, mode) = source_or_piped(parsed, "move");
                args.push(("to".to_string(), ParamValue::Str(destination)));
                (op, args, mode)
            }
            "filter_files" => {
                if predicates.is_empty() {
                    return Err(ProcessError::InvalidParameter {
                        intent: parsed.intent.clone(),
                        name: "condition".to_string(),
                        reason: "a filter step needs at least one condition".to_string(),
                    });
                }
                ("filter", vec![], InputMode::Consumes)
            }
            "count_files" => source_or_piped(parsed, "count"),
            other => {
                return Err(ProcessError::InvalidParameter {
                    intent: other.to_string(),
                    name: "intent".to_string(),
                    reason: "not a file-domain intent".to_string(),
                })
            }
        };

        let rendered = render(operation, &args, &predicates);

        Ok(DomainCommand {
            domain: DOMAIN.to_string(),
            operation: operation.to_string(),
            args,
            predicates,
            input_mode,
            rendered,
        })
    }
}

/// Operations that either declare their own source (pattern + path present)
/// or consume the previous pipeline step's file list.
fn source_or_piped(
    parsed: &ParseResult,
    op: &'static str,
) -> (&'static str, Vec<(String, ParamValue)>, InputMode) {
    let has_source = parsed.get_str("extension").is_some() || parsed.get_str("pattern").is_some();
    if has_source {
        let pattern = file_pattern(parsed);
        let path = parsed.get_str("directory").unwrap_or(".").to_string();
        (
            op,
            vec![
                ("pattern".to_string(), ParamValue::Str(pattern)),
                ("path".to_string(), ParamValue::Str(path)),
            ],
            InputMode::Independent,
        )
    } else {
        (op, vec![], InputMode::Consumes)
    }
}

/// Turn an extension or explicit glob into the effective glob pattern.
fn file_pattern(parsed: &ParseResult) -> String {
    if let Some(p) = parsed.get_str("pattern") {
        return p.to_string();
    }
    match parsed.get_str("extension") {
        Some(ext) if ext.starts_with("*.") => ext.to_string(),
        Some(ext) => format!("*.{ext}"),
        None => "*".to_string(),
    }
}

/// Rebuild the structured predicates from the parser's flattened
/// `where_{i}_*` parameters.
fn collect_predicates(parsed: &ParseResult) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::new();

    for index in 0.. {
        let field_key = format!("where_{index}_field");
        let Some(field) = parsed.get_str(&field_key) else {
            break;
        };
        let op_str = parsed.require_str(&format!("where_{index}_op"))?;
        let op = match op_str {
            ">" => CmpOp::Gt,
            "<" => CmpOp::Lt,
            ">=" => CmpOp::Ge,
            "<=" => CmpOp::Le,
            "=" => CmpOp::Eq,
            "<>" => CmpOp::Ne,
            "contains" => CmpOp::Contains,
            "not_contains" => CmpOp::NotContains,
            other => {
                return Err(ProcessError::InvalidParameter {
                    intent: parsed.intent.clone(),
                    name: format!("where_{index}_op"),
                    reason: format!("unknown comparison '{other}'"),
                })
            }
        };
        let value = parsed
            .parameters
            .get(&format!("where_{index}_value"))
            .cloned()
            .ok_or_else(|| ProcessError::InvalidParameter {
                intent: parsed.intent.clone(),
                name: format!("where_{index}_value"),
                reason: "condition value is missing".to_string(),
            })?;

        predicates.push(Predicate {
            field: field.to_string(),
            op,
            value,
        });
    }

    Ok(predicates)
}

/// Render the DSL form: `op(key="value", ...).where(field op value)...`
fn render(operation: &str, args: &[(String, ParamValue)], predicates: &[Predicate]) -> String {
    let mut out = String::from(operation);
    out.push('(');
    for (i, (name, value)) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match value {
            ParamValue::Str(s) => out.push_str(&format!("{name}=\"{s}\"")),
            ParamValue::Num(_) => out.push_str(&format!("{name}={value}")),
        }
    }
    out.push(')');
    for p in predicates {
        out.push_str(&format!(".where({p})"));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileParser;
    use crate::registry::Parser;

    fn translate(text: &str) -> Result<DomainCommand> {
        let parsed = FileParser.parse(text)?;
        FileTranslator.translate(&parsed)
    }

    #[test]
    fn test_find_renders_every_parameter() {
        let cmd = translate("znajdź wszystkie pliki txt w katalogu projekty").unwrap();
        assert_eq!(cmd.operation, "find");
        assert_eq!(cmd.input_mode, InputMode::Independent);
        assert!(cmd.rendered.contains("txt"), "rendered: {}", cmd.rendered);
        assert!(cmd.rendered.contains("projekty"), "rendered: {}", cmd.rendered);
    }

    #[test]
    fn test_size_predicate_carried() {
        let cmd = translate("znajdź pliki txt większe niż 1 mb").unwrap();
        assert_eq!(cmd.predicates.len(), 1);
        assert_eq!(cmd.predicates[0].field, "size");
        assert_eq!(cmd.predicates[0].op, CmpOp::Gt);
        assert!(cmd.rendered.contains(".where(size >"));
    }

    #[test]
    fn test_piped_copy_consumes_input() {
        let cmd = translate("skopiuj do katalogu backup").unwrap();
        assert_eq!(cmd.operation, "copy");
        assert_eq!(cmd.input_mode, InputMode::Consumes);
        assert_eq!(cmd.arg_str("to"), Some("backup"));
    }

    #[test]
    fn test_sourced_copy_is_independent() {
        let cmd = translate("skopiuj pliki pdf z raporty do archiwum").unwrap();
        assert_eq!(cmd.operation, "copy");
        assert_eq!(cmd.input_mode, InputMode::Independent);
        assert_eq!(cmd.arg_str("pattern"), Some("*.pdf"));
        assert_eq!(cmd.arg_str("path"), Some("raporty"));
        assert_eq!(cmd.arg_str("to"), Some("archiwum"));
    }

    #[test]
    fn test_copy_without_destination_is_invalid() {
        let err = translate("skopiuj pliki").unwrap_err();
        assert!(matches!(err, ProcessError::InvalidParameter { .. }));
    }

    #[test]
    fn test_filter_without_condition_is_invalid() {
        let parsed = FileParser.parse("wybierz pliki").unwrap();
        // parses as a filter step but carries no condition
        if parsed.intent == "filter_files" {
            let err = FileTranslator.translate(&parsed).unwrap_err();
            assert!(matches!(err, ProcessError::InvalidParameter { .. }));
        }
    }
}
