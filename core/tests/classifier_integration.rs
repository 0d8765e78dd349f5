use std::path::Path;

use pretty_assertions::assert_eq;

use egrun_core::api::{ClassifierConfig, Outcome, OutcomeClassifier};
use egrun_core::classify::log_files;

fn write(root: &Path, rel: &str, body: &[u8]) {
    let p = root.join(rel);
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(p, body).unwrap();
}

fn classifier() -> OutcomeClassifier {
    OutcomeClassifier::new(&ClassifierConfig::default()).unwrap()
}

#[test]
fn clean_logs_are_success() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "flow/Program.log", b"NOTE: fine\nWARNING: careful\n");
    write(dir.path(), "flow/deeper/Query.log", b"NOTE: Table WORK.Q created\n");

    assert_eq!(classifier().classify(dir.path()).unwrap(), Outcome::Success);
}

#[test]
fn error_in_nested_log_is_failure_with_full_line() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a/Clean.log", b"NOTE: ok\n");
    write(
        dir.path(),
        "b/c/Broken.log",
        b"NOTE: before\nERROR: Variable X not found.\nERROR: second one\n",
    );

    match classifier().classify(dir.path()).unwrap() {
        Outcome::Failure {
            failing_log_name,
            failing_log_path,
            failing_line,
        } => {
            assert_eq!(failing_log_name, "Broken");
            assert!(failing_log_path.ends_with("b/c/Broken.log"));
            assert_eq!(failing_line, "ERROR: Variable X not found.");
        }
        Outcome::Success => panic!("expected failure"),
    }
}

#[test]
fn only_log_files_are_scanned() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Program.sas", b"ERROR: this is code, not a log\n");
    write(dir.path(), "Program.log", b"NOTE: ok\n");

    assert_eq!(classifier().classify(dir.path()).unwrap(), Outcome::Success);
    assert_eq!(log_files(dir.path()).unwrap().len(), 1);
}

#[test]
fn empty_directory_is_success() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(classifier().classify(dir.path()).unwrap(), Outcome::Success);
}

#[test]
fn classification_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "x/One.log", b"ERROR: one\n");
    write(dir.path(), "y/Two.log", b"ERROR 180-322: two\n");

    let c = classifier();
    let first = c.classify(dir.path()).unwrap();
    let second = c.classify(dir.path()).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_success());
}

#[test]
fn fallback_encoding_decodes_localized_logs() {
    let dir = tempfile::tempdir().unwrap();
    // "ERROR: " followed by "エラー" in Shift_JIS
    let mut body = b"NOTE: start\nERROR: ".to_vec();
    body.extend_from_slice(&[0x83, 0x47, 0x83, 0x89, 0x81, 0x5B]);
    body.push(b'\n');
    write(dir.path(), "Program.log", &body);

    let cfg = ClassifierConfig {
        fallback_encoding: Some("shift_jis".into()),
        ..ClassifierConfig::default()
    };
    let outcome = OutcomeClassifier::new(&cfg).unwrap().classify(dir.path()).unwrap();
    match outcome {
        Outcome::Failure { failing_line, .. } => assert_eq!(failing_line, "ERROR: エラー"),
        Outcome::Success => panic!("expected failure"),
    }
}

#[test]
fn directory_names_with_glob_metacharacters_are_escaped() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("[weird] name_CodeAndLogs");
    write(&dir, "Program.log", b"ERROR: found\n");

    assert!(!classifier().classify(&dir).unwrap().is_success());
}
