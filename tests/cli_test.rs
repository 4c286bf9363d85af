use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Path to the compiled dialect-rewriter binary
fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dialect-rewriter"))
}

/// Get the path to the fixtures directory
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

fn fixture(name: &str) -> String {
    fs::read_to_string(fixtures_dir().join(name)).expect("Failed to read fixture")
}

#[test]
fn test_convert_header() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("parser.hh");
    let root = fixtures_dir();

    let output = run(&[
        "--root",
        root.to_str().unwrap(),
        output_path.to_str().unwrap(),
        "Parser.h",
    ]);

    assert!(output.status.success(), "Binary failed: {:?}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Converted Parser.h"), "Unexpected output: {}", stdout);
    assert_eq!(fs::read_to_string(&output_path).unwrap(), fixture("Parser.expected.h"));
}

#[test]
fn test_convert_with_declarations_from_header() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("parser.cc");
    let root = fixtures_dir();

    let output = run(&[
        "--root",
        root.to_str().unwrap(),
        output_path.to_str().unwrap(),
        "Parser.cpp",
        "Parser.h",
    ]);

    assert!(output.status.success(), "Binary failed: {:?}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read_to_string(&output_path).unwrap(), fixture("Parser.expected.cpp"));
}

#[test]
fn test_converted_output_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.hh");
    let second = dir.path().join("second.hh");
    let root = fixtures_dir();

    let output = run(&["--root", root.to_str().unwrap(), first.to_str().unwrap(), "Parser.h"]);
    assert!(output.status.success());

    let output = run(&[second.to_str().unwrap(), first.to_str().unwrap()]);
    assert!(output.status.success(), "Binary failed: {:?}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(fs::read_to_string(&second).unwrap(), fs::read_to_string(&first).unwrap());
}

#[test]
fn test_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("parser.hh");
    let root = fixtures_dir();

    let output = run(&[
        "--json",
        "--root",
        root.to_str().unwrap(),
        output_path.to_str().unwrap(),
        "Parser.h",
    ]);

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("Invalid JSON report");
    assert_eq!(report["success"], true);
    assert_eq!(report["file"], "Parser.h");
    assert_eq!(report["injection_skipped"], false);
    assert_eq!(report["headers"].as_array().unwrap().len(), 5);
    assert_eq!(report["execution_id"].as_str().unwrap().len(), 36);
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.hh");
    let root = fixtures_dir();

    let output = run(&[
        "--root",
        root.to_str().unwrap(),
        output_path.to_str().unwrap(),
        "Parser.cpp",
        "Missing.h",
    ]);

    assert!(!output.status.success(), "Binary should fail on a missing file");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Missing.h"), "Error should name the file: {}", stdout);
    assert!(!output_path.exists(), "No output should be written");
}

#[test]
fn test_include_prefix_and_config() {
    let dir = tempfile::tempdir().unwrap();
    let from_flag = dir.path().join("flag.hh");
    let from_config = dir.path().join("config.hh");
    let root = fixtures_dir();
    let config = root.join("options.json");

    let output = run(&[
        "--include-prefix",
        "parser/",
        "--root",
        root.to_str().unwrap(),
        from_flag.to_str().unwrap(),
        "Parser.h",
    ]);
    assert!(output.status.success());

    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "--root",
        root.to_str().unwrap(),
        from_config.to_str().unwrap(),
        "Parser.h",
    ]);
    assert!(output.status.success());

    let flag_text = fs::read_to_string(&from_flag).unwrap();
    assert!(flag_text.contains("#include \"parser/ast.hh\""));
    assert!(flag_text.contains("#include \"parser/intrusive_ptr.hh\""));
    assert!(fs::read_to_string(&from_config).unwrap().contains("#include \"lib/ast.hh\""));
}

#[test]
fn test_dump_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("unused.hh");
    let root = fixtures_dir();

    let output = run(&[
        "--dump-tokens",
        "--root",
        root.to_str().unwrap(),
        output_path.to_str().unwrap(),
        "Parser.h",
    ]);

    assert!(output.status.success());
    let tokens: serde_json::Value = serde_json::from_slice(&output.stdout).expect("Invalid token JSON");
    let tokens = tokens.as_array().unwrap();
    assert_eq!(tokens[0]["text"], "#");
    assert_eq!(tokens[1]["text"], "pragma");
    assert_eq!(tokens[1]["kind"], "Identifier");
    assert!(!output_path.exists());
}
