use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Creates a small HTML tree: two documents in path order plus a non-matching file.
fn create_site(root: &Path) {
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("a.html"), "<body><h1>Alpha</h1></body>").unwrap();
    fs::write(root.join("docs/b.html"), "<p>  beta   text  </p>").unwrap();
    fs::write(root.join("notes.txt"), "ignored").unwrap();
}

#[test]
fn test_html_combine_happy_flow_writes_single_batch() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    create_site(input.path());

    let mut cmd = Command::cargo_bin("purr").expect("Binary exists");
    cmd.arg("html-combine")
        .arg(input.path())
        .arg("--output")
        .arg(output.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Combine complete").and(predicate::str::contains("2 document(s)")));

    let batch = fs::read_to_string(output.path().join("combined_1.html")).unwrap();
    assert_eq!(batch, "<body><h1>Alpha</h1></body><p>  beta   text  </p>");
    assert!(!output.path().join("combined_2.html").exists());
}

#[test]
fn test_html_combine_minify_and_md_alias() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    create_site(input.path());

    let mut cmd = Command::cargo_bin("purr").expect("Binary exists");
    cmd.arg("combine")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--minify")
        .arg("--md");

    cmd.assert().success();

    let batch = fs::read_to_string(output.path().join("combined_1.md")).unwrap();
    assert!(batch.starts_with("# Alpha"), "got: {batch:?}");
    assert!(batch.contains("beta text"), "got: {batch:?}");
}

#[test]
fn test_html_combine_splits_on_max_size() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(input.path().join("1.html"), "x".repeat(40)).unwrap();
    fs::write(input.path().join("2.html"), "y".repeat(50)).unwrap();
    fs::write(input.path().join("3.html"), "z".repeat(10)).unwrap();

    let mut cmd = Command::cargo_bin("purr").expect("Binary exists");
    cmd.arg("html-combine")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--max-size")
        .arg("80");

    cmd.assert().success();

    assert_eq!(fs::metadata(output.path().join("combined_1.html")).unwrap().len(), 40);
    assert_eq!(fs::metadata(output.path().join("combined_2.html")).unwrap().len(), 60);
    assert!(!output.path().join("combined_3.html").exists());
}

#[test]
fn test_html_combine_json_report() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    create_site(input.path());

    let mut cmd = Command::cargo_bin("purr").expect("Binary exists");
    let assert = cmd
        .arg("html-combine")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(report["documents_written"], 2);
    assert_eq!(report["batches"].as_array().unwrap().len(), 1);
    assert_eq!(report["cancelled"], false);
}

#[test]
fn test_html_combine_missing_input_fails() {
    let tmp = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("purr").expect("Binary exists");
    cmd.arg("html-combine")
        .arg(tmp.path().join("does-not-exist"))
        .arg("--output")
        .arg(tmp.path().join("out"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("input directory not found"));
}

#[test]
fn test_html_combine_rejects_non_positive_max_size() {
    let input = tempdir().unwrap();
    create_site(input.path());

    let mut cmd = Command::cargo_bin("purr").expect("Binary exists");
    cmd.arg("html-combine")
        .arg(input.path())
        .arg("--output")
        .arg(input.path().join("out"))
        .arg("--max-size")
        .arg("-1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("max_size"));
}

#[test]
fn test_html_combine_reads_defaults_from_config_file() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    create_site(input.path());
    let config = input.path().join("purr.yaml");
    fs::write(
        &config,
        format!(
            "output_dir: {}\nmarkdown: true\njobs: 2\n",
            output.path().display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("purr").expect("Binary exists");
    cmd.arg("html-combine")
        .arg(input.path())
        .arg("--config")
        .arg(&config);

    cmd.assert().success();
    assert!(output.path().join("combined_1.md").exists());
}
