//! Executor for file-operation commands.
//!
//! Performs real filesystem work. Expected failures — missing directory,
//! bad glob, unreadable source — come back as failed CommandResults so a
//! pipeline can stop cleanly; only genuine I/O surprises during otherwise
//! valid operations propagate.
//!
//! Results are sorted, so repeated executions against unchanged state are
//! identical.

use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::registry::Executor;
use crate::types::{CmpOp, CommandResult, DomainCommand, ParamValue, Predicate, Result, ResultData};

pub struct FileExecutor;

impl Executor for FileExecutor {
    fn execute(&self, command: &DomainCommand, input: &ResultData) -> Result<CommandResult> {
        let result = match command.operation.as_str() {
            "find" => self.find(command),
            "list" => self.list(command),
            "create" => self.create(command),
            "mkdir" => self.mkdir(command),
            "filter" => self.filter(command, input),
            "delete" => self.delete(command, input),
            "copy" => self.transfer(command, input, false),
            "move" => self.transfer(command, input, true),
            "count" => self.count(command, input),
            other => CommandResult::fail(format!("unknown file operation '{other}'")),
        };
        Ok(result)
    }
}

impl FileExecutor {
    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    fn find(&self, command: &DomainCommand) -> CommandResult {
        match self.find_paths(command) {
            Ok(paths) => CommandResult::ok(ResultData::List(paths)),
            Err(failure) => failure,
        }
    }

    fn list(&self, command: &DomainCommand) -> CommandResult {
        let path = Path::new(command.arg_str("path").unwrap_or("."));
        if !path.is_dir() {
            return CommandResult::fail(format!("directory not found: {}", path.display()));
        }

        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => return CommandResult::fail(format!("cannot read {}: {e}", path.display())),
        };

        let mut rows: Vec<BTreeMap<String, ParamValue>> = Vec::new();
        for entry in entries.flatten() {
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            let mut row = BTreeMap::new();
            row.insert(
                "name".to_string(),
                ParamValue::Str(entry.file_name().to_string_lossy().into_owned()),
            );
            row.insert(
                "path".to_string(),
                ParamValue::Str(entry.path().to_string_lossy().into_owned()),
            );
            row.insert(
                "kind".to_string(),
                ParamValue::Str(if meta.is_dir() { "dir" } else { "file" }.to_string()),
            );
            row.insert("size".to_string(), ParamValue::Num(meta.len() as f64));
            rows.push(row);
        }
        rows.sort_by(|a, b| a.get("name").cloned().map(|v| v.to_string()).cmp(
            &b.get("name").cloned().map(|v| v.to_string()),
        ));

        CommandResult::ok(ResultData::Records(rows))
    }

    fn create(&self, command: &DomainCommand) -> CommandResult {
        let Some(name) = command.arg_str("name") else {
            return CommandResult::fail("create needs a file name");
        };
        let target = match command.arg_str("path") {
            Some(dir) => Path::new(dir).join(name),
            None => PathBuf::from(name),
        };

        if target.exists() {
            return CommandResult::fail(format!("already exists: {}", target.display()));
        }
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return CommandResult::fail(format!("cannot create {}: {e}", parent.display()));
                }
            }
        }
        match fs::File::create(&target) {
            Ok(_) => CommandResult::ok(ResultData::List(vec![target.to_string_lossy().into_owned()])),
            Err(e) => CommandResult::fail(format!("cannot create {}: {e}", target.display())),
        }
    }

    fn mkdir(&self, command: &DomainCommand) -> CommandResult {
        let Some(name) = command.arg_str("name") else {
            return CommandResult::fail("mkdir needs a directory name");
        };
        let target = Path::new(name);
        if target.exists() {
            return CommandResult::fail(format!("already exists: {}", target.display()));
        }
        match fs::create_dir_all(target) {
            Ok(_) => CommandResult::ok(ResultData::List(vec![name.to_string()])),
            Err(e) => CommandResult::fail(format!("cannot create {}: {e}", target.display())),
        }
    }

    fn filter(&self, command: &DomainCommand, input: &ResultData) -> CommandResult {
        let paths = match input_paths(input) {
            Some(paths) => paths,
            None => return CommandResult::fail("filter needs a file list as input"),
        };
        let kept: Vec<String> = paths
            .into_iter()
            .filter(|p| matches_predicates(Path::new(p), &command.predicates))
            .collect();
        CommandResult::ok(ResultData::List(kept))
    }

    fn delete(&self, command: &DomainCommand, input: &ResultData) -> CommandResult {
        let paths = match self.source_paths(command, input) {
            Ok(paths) => paths,
            Err(failure) => return failure,
        };

        let mut errors = Vec::new();
        let mut removed = 0u64;
        for path in &paths {
            match fs::remove_file(path) {
                Ok(_) => removed += 1,
                Err(e) => errors.push(format!("{path}: {e}")),
            }
        }

        if errors.is_empty() {
            CommandResult::ok(ResultData::Count(removed))
        } else {
            CommandResult::fail(format!(
                "deleted {removed} of {} files; failures: {}",
                paths.len(),
                errors.join("; ")
            ))
        }
    }

    fn transfer(&self, command: &DomainCommand, input: &ResultData, remove_source: bool) -> CommandResult {
        let verb = if remove_source { "move" } else { "copy" };
        let Some(destination) = command.arg_str("to") else {
            return CommandResult::fail(format!("{verb} needs a destination"));
        };
        let paths = match self.source_paths(command, input) {
            Ok(paths) => paths,
            Err(failure) => return failure,
        };

        let dest_dir = Path::new(destination);
        if let Err(e) = fs::create_dir_all(dest_dir) {
            return CommandResult::fail(format!("cannot create {}: {e}", dest_dir.display()));
        }

        let mut produced = Vec::new();
        for source in &paths {
            let source_path = Path::new(source);
            let Some(file_name) = source_path.file_name() else {
                return CommandResult::fail(format!("not a file path: {source}"));
            };
            let target = dest_dir.join(file_name);
            let outcome = if remove_source {
                fs::rename(source_path, &target)
            } else {
                fs::copy(source_path, &target).map(|_| ())
            };
            if let Err(e) = outcome {
                return CommandResult::fail(format!("cannot {verb} {source}: {e}"));
            }
            produced.push(target.to_string_lossy().into_owned());
        }
        produced.sort();

        CommandResult::ok(ResultData::List(produced))
    }

    fn count(&self, command: &DomainCommand, input: &ResultData) -> CommandResult {
        match self.source_paths(command, input) {
            Ok(paths) => CommandResult::ok(ResultData::Count(paths.len() as u64)),
            Err(failure) => failure,
        }
    }

    // -----------------------------------------------------------------------
    // Sources
    // -----------------------------------------------------------------------

    /// A self-sourced command (pattern arg present) finds its own files;
    /// a piped command takes the previous step's list.
    fn source_paths(
        &self,
        command: &DomainCommand,
        input: &ResultData,
    ) -> std::result::Result<Vec<String>, CommandResult> {
        if command.arg("pattern").is_some() {
            return self.find_paths(command);
        }
        input_paths(input)
            .ok_or_else(|| CommandResult::fail("no file list input and no source pattern"))
    }

    fn find_paths(&self, command: &DomainCommand) -> std::result::Result<Vec<String>, CommandResult> {
        let pattern = command.arg_str("pattern").unwrap_or("*");
        let root = Path::new(command.arg_str("path").unwrap_or("."));

        if !root.is_dir() {
            return Err(CommandResult::fail(format!(
                "directory not found: {}",
                root.display()
            )));
        }
        let matcher = match Glob::new(pattern) {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => return Err(CommandResult::fail(format!("bad pattern '{pattern}': {e}"))),
        };

        let mut paths: Vec<String> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| matches_name(&matcher, e.path()))
            .filter(|e| matches_predicates(e.path(), &command.predicates))
            .map(|e| e.path().to_string_lossy().into_owned())
            .collect();
        paths.sort();

        Ok(paths)
    }
}

fn matches_name(matcher: &GlobMatcher, path: &Path) -> bool {
    path.file_name()
        .map(|name| matcher.is_match(name))
        .unwrap_or(false)
}

fn input_paths(input: &ResultData) -> Option<Vec<String>> {
    match input {
        ResultData::List(items) => Some(items.clone()),
        ResultData::Records(rows) => Some(
            rows.iter()
                .filter_map(|row| row.get("path").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn matches_predicates(path: &Path, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| matches_predicate(path, p))
}

fn matches_predicate(path: &Path, predicate: &Predicate) -> bool {
    match predicate.field.as_str() {
        "size" => {
            let Ok(meta) = path.metadata() else {
                return false;
            };
            let Some(wanted) = predicate.value.as_num() else {
                return false;
            };
            cmp_num(meta.len() as f64, predicate.op, wanted)
        }
        "age_days" => {
            let age = match file_age_days(path) {
                Some(age) => age,
                None => return false,
            };
            let Some(wanted) = predicate.value.as_num() else {
                return false;
            };
            cmp_num(age, predicate.op, wanted)
        }
        "content" => {
            let Some(needle) = predicate.value.as_str() else {
                return false;
            };
            let found = fs::read_to_string(path)
                .map(|content| content.contains(needle))
                .unwrap_or(false);
            match predicate.op {
                CmpOp::Contains => found,
                CmpOp::NotContains => !found,
                _ => false,
            }
        }
        _ => false,
    }
}

fn file_age_days(path: &Path) -> Option<f64> {
    let modified = path.metadata().ok()?.modified().ok()?;
    let elapsed = SystemTime::now().duration_since(modified).ok()?;
    Some(elapsed.as_secs_f64() / 86_400.0)
}

fn cmp_num(actual: f64, op: CmpOp, wanted: f64) -> bool {
    match op {
        CmpOp::Gt => actual > wanted,
        CmpOp::Lt => actual < wanted,
        CmpOp::Ge => actual >= wanted,
        CmpOp::Le => actual <= wanted,
        CmpOp::Eq => actual == wanted,
        CmpOp::Ne => actual != wanted,
        CmpOp::Contains | CmpOp::NotContains => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
