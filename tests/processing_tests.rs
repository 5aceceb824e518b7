// ===========================================================================
// End-to-end processing: file domain through the Processor front door
// ===========================================================================

use std::fs;

use parlance::types::{ProcessError, ResultData};
use parlance::{files, Processor};

fn file_processor() -> Processor {
    let mut processor = Processor::new();
    files::register_into(processor.registry_mut());
    processor
}

/// Helper: a directory tree with txt/md files of known sizes.
fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let projekty = dir.path().join("projekty");
    fs::create_dir(&projekty).unwrap();
    fs::write(projekty.join("plan.txt"), "plan projektu").unwrap();
    fs::write(projekty.join("raport.txt"), "x".repeat(2048)).unwrap();
    fs::write(projekty.join("notatki.md"), "notatki").unwrap();
    dir
}

#[test]
fn test_polish_find_scenario_end_to_end() {
    let dir = fixture();
    let mut processor = file_processor();

    let command = format!(
        "znajdź wszystkie pliki txt w katalogu \"{}\"",
        dir.path().join("projekty").display()
    );
    let result = processor.process(&command, None).unwrap();

    assert!(result.success);
    match result.data {
        ResultData::List(paths) => {
            assert_eq!(paths.len(), 2);
            assert!(paths.iter().all(|p| p.ends_with(".txt")));
        }
        other => panic!("expected a path list, got {other:?}"),
    }
}

#[test]
fn test_parse_result_for_polish_find() {
    let processor = file_processor();
    let (parsed, _) = processor
        .analyze("znajdź wszystkie pliki txt w katalogu projekty", None)
        .unwrap();

    assert_eq!(parsed.intent, "find_files");
    assert_eq!(parsed.domain, "file");
    assert_eq!(parsed.get_str("extension"), Some("txt"));
    assert_eq!(parsed.get_str("directory"), Some("projekty"));
    assert!(parsed.confidence > 0.3);
}

#[test]
fn test_round_trip_rendering_references_parameters() {
    let processor = file_processor();
    let (parsed, command) = processor
        .analyze("znajdź pliki pdf większe niż 5 mb w katalogu archiwum", None)
        .unwrap();

    // every extracted parameter value must be visible in the rendering
    assert!(command.rendered.contains("pdf"), "rendered: {}", command.rendered);
    assert!(command.rendered.contains("archiwum"), "rendered: {}", command.rendered);
    assert!(command.rendered.contains("size >"), "rendered: {}", command.rendered);
    assert_eq!(parsed.get_str("extension"), Some("pdf"));
}

#[test]
fn test_missing_directory_is_failed_result_not_error() {
    let mut processor = file_processor();
    let result = processor
        .process("znajdź pliki txt w katalogu /nie/ma/takiego", None)
        .unwrap();

    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("directory not found"));
}

#[test]
fn test_unregistered_domain_fails_before_side_effects() {
    let mut processor = file_processor();
    let err = processor.process("znajdź pliki txt", Some("sql")).unwrap_err();
    assert!(matches!(err, ProcessError::DomainNotRegistered { .. }));
}

#[test]
fn test_unrecognized_command_carries_original_text() {
    let mut processor = file_processor();
    let err = processor
        .process("kompletnie niezrozumiałe zdanie", None)
        .unwrap_err();
    match err {
        ProcessError::UnrecognizedIntent { text, .. } => {
            assert!(text.contains("niezrozumiałe"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_copy_end_to_end() {
    let dir = fixture();
    let mut processor = file_processor();
    let source = dir.path().join("projekty");
    let target = dir.path().join("backup");

    let command = format!(
        "skopiuj pliki txt z \"{}\" do \"{}\"",
        source.display(),
        target.display()
    );
    let result = processor.process(&command, None).unwrap();

    assert!(result.success, "error: {:?}", result.error);
    assert!(target.join("plan.txt").exists());
    assert!(target.join("raport.txt").exists());
    assert!(!target.join("notatki.md").exists());
}

#[test]
fn test_debug_report_exposes_stages() {
    let processor = file_processor();
    let report =
        parlance::trace::debug_process(&processor, "usuń pliki log starsze niż 7 dni", None)
            .unwrap();

    assert_eq!(report.parse.intent, "delete_files");
    assert_eq!(report.command.operation, "delete");
    assert_eq!(report.command.predicates.len(), 1);
    assert_eq!(report.command.predicates[0].field, "age_days");
}
