// ---------------------------------------------------------------------------
// parlance CLI — interactive natural-language command REPL
// ---------------------------------------------------------------------------
//
// Registers the file-operations domain (and the SQL domain when a database
// path is given) and processes commands line by line:
//
//   parlance [--db orders.sqlite]
//
// Meta-commands:
//   :debug <command>   show the ParseResult and DomainCommand, don't execute
//   :pipeline          read numbered lines until a blank line, build, run
//   :domains           list registered domains
//   :quit              exit

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use parlance::trace::debug_process;
use parlance::types::{CommandResult, ResultData};
use parlance::{files, sql, Processor};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut processor = Processor::new();
    files::register_into(processor.registry_mut());

    if let Some(db_path) = db_arg() {
        match rusqlite::Connection::open(&db_path) {
            Ok(connection) => match sql::register_into(processor.registry_mut(), connection) {
                Ok(()) => println!("sql domain ready ({db_path})"),
                Err(e) => eprintln!("cannot load schema from {db_path}: {e}"),
            },
            Err(e) => eprintln!("cannot open {db_path}: {e}"),
        }
    }

    println!("parlance — natural-language commands (:quit to exit)");

    let mut editor = DefaultEditor::new().expect("failed to create line editor");
    loop {
        match editor.readline("parlance> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if line == ":quit" || line == ":q" {
                    break;
                }
                handle_line(&mut processor, &mut editor, line);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(_) => break,
        }
    }
}

fn db_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--db" {
            return args.next();
        }
    }
    None
}

fn handle_line(processor: &mut Processor, editor: &mut DefaultEditor, line: &str) {
    if let Some(rest) = line.strip_prefix(":debug ") {
        match debug_process(processor, rest, None) {
            Ok(report) => {
                println!("intent:     {} (domain {})", report.parse.intent, report.parse.domain);
                println!("confidence: {:.2}", report.parse.confidence);
                for (name, value) in &report.parse.parameters {
                    println!("  {name} = {value}");
                }
                println!("command:    {}", report.command.rendered);
            }
            Err(e) => println!("error: {e}"),
        }
        return;
    }

    if line == ":pipeline" {
        run_pipeline(processor, editor);
        return;
    }

    if line == ":domains" {
        for domain in processor.registry().domains() {
            println!("  {domain}");
        }
        return;
    }

    match processor.process(line, None) {
        Ok(result) => print_result(&result),
        Err(e) => println!("error: {e}"),
    }
}

fn run_pipeline(processor: &mut Processor, editor: &mut DefaultEditor) {
    println!("enter pipeline steps, blank line to run:");
    let mut lines = Vec::new();
    loop {
        match editor.readline("  ... ") {
            Ok(line) if line.trim().is_empty() => break,
            Ok(line) => lines.push(line),
            Err(_) => return,
        }
    }

    let text = lines.join("\n");
    let pipeline = match processor.create_pipeline(&text) {
        Ok(p) => p,
        Err(e) => {
            println!("build failed: {e}");
            return;
        }
    };

    match processor.execute_pipeline(&pipeline, ResultData::None) {
        Ok(outcome) => {
            for step in &outcome.trace {
                let mark = if step.success { "ok" } else { "FAILED" };
                println!("  [{}] {} — {mark}", step.index + 1, step.rendered);
            }
            if let Some(index) = outcome.failed_step {
                println!("halted at step {}: {}", index + 1, outcome.result);
            } else {
                print_result(&outcome.result);
            }
        }
        Err(e) => println!("error: {e}"),
    }
}

fn print_result(result: &CommandResult) {
    if let Some(sql) = &result.sql {
        println!("sql: {sql}");
    }
    if !result.success {
        println!("failed: {}", result.error.as_deref().unwrap_or("unknown"));
        return;
    }
    match &result.data {
        ResultData::None => println!("ok"),
        ResultData::Text(text) => println!("{text}"),
        ResultData::Count(n) => println!("{n}"),
        ResultData::List(items) => {
            for item in items {
                println!("{item}");
            }
            println!("({} items)", items.len());
        }
        ResultData::Records(rows) => {
            for row in rows {
                let cells: Vec<String> =
                    row.iter().map(|(k, v)| format!("{k}={v}")).collect();
                println!("{}", cells.join("  "));
            }
            println!("({} rows)", rows.len());
        }
    }
}
