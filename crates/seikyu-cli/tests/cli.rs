use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const INVOICE: &str = "\
請求書
請求書番号: INV-2024-0042
発行日: 令和6年11月24日

請求先
株式会社サンプル 御中

株式会社発行商事
登録番号: T1234567890123

品名|数量|単価|金額
Web制作|1|100,000|100,000
小計 ¥100,000
消費税(10%) ¥10,000
ご請求金額 ¥110,000
";

/// A `seikyu` command whose default config location is inside `home`.
fn seikyu(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("seikyu").unwrap();
    cmd.env("XDG_CONFIG_HOME", home).env("HOME", home);
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn process_prints_json_record() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.pdf.txt", INVOICE);

    let output = seikyu(dir.path())
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["basic_info"]["invoice_number"], "INV-2024-0042");
    assert_eq!(json["basic_info"]["issue_date"], "2024-11-24");
    assert_eq!(json["issuer"]["registration_number"], "T1234567890123");
    assert_eq!(json["metadata"]["file_name"], "invoice.pdf");
    assert_eq!(json["metadata"]["source"], "pdf_import");
    assert_eq!(json["line_items"].as_array().unwrap().len(), 1);
}

#[test]
fn process_uses_given_source_name_and_hash() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "upload.txt", INVOICE);

    let output = seikyu(dir.path())
        .args(["process", "--source-name", "scan.png", "--file-hash", "abc123"])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["metadata"]["file_name"], "scan.png");
    assert_eq!(json["metadata"]["file_hash"], "abc123");
    assert_eq!(json["metadata"]["source"], "image_import");
}

#[test]
fn process_is_deterministic_apart_from_timestamps() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.pdf.txt", INVOICE);

    let run = || {
        let stdout = seikyu(dir.path())
            .arg("process")
            .arg(&input)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let mut json: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
        let metadata = json["metadata"].as_object_mut().unwrap();
        metadata.remove("created_at");
        metadata.remove("updated_at");
        json
    };

    assert_eq!(run(), run());
}

#[test]
fn process_writes_text_summary_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.pdf.txt", INVOICE);
    let out = dir.path().join("summary.txt");

    seikyu(dir.path())
        .args(["process", "--format", "text", "--output"])
        .arg(&out)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Output written to"));

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("Invoice: INV-2024-0042"));
    assert!(text.contains("株式会社サンプル"));
    assert!(text.contains("Total:    110000 JPY"));
}

#[test]
fn process_show_confidence_lists_fields() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "invoice.pdf.txt", INVOICE);

    seikyu(dir.path())
        .args(["process", "--format", "csv", "--show-confidence"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Completeness:"))
        .stdout(predicate::str::contains("basic_info.invoice_number"));
}

#[test]
fn process_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    seikyu(dir.path())
        .arg("process")
        .arg(dir.path().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_blank_file_fails() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "blank.txt", "   \n");

    seikyu(dir.path())
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no text recognized"));
}

#[test]
fn batch_writes_outputs_and_summary() {
    let dir = TempDir::new().unwrap();
    let inbox = dir.path().join("inbox");
    fs::create_dir(&inbox).unwrap();
    write(&inbox, "a.pdf.txt", INVOICE);
    write(&inbox, "b.png.txt", "ご請求金額 ¥55,000\n");
    let out = dir.path().join("out");

    seikyu(dir.path())
        .arg("batch")
        .arg(format!("{}/*.txt", inbox.display()))
        .args(["--summary", "-j", "2", "--output-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful, 0 failed"));

    assert!(out.join("a.pdf.json").exists());
    assert!(out.join("b.png.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("a.pdf.txt,success,INV-2024-0042"));
    assert!(lines[2].starts_with("b.png.txt,success"));
}

#[test]
fn batch_stops_on_error_by_default() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.txt", INVOICE);
    write(dir.path(), "bad.txt", "");

    seikyu(dir.path())
        .arg("batch")
        .arg(format!("{}/*.txt", dir.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn batch_continue_on_error_records_failure() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.txt", INVOICE);
    write(dir.path(), "bad.txt", "");
    let out = dir.path().join("out");

    seikyu(dir.path())
        .arg("batch")
        .arg(format!("{}/*.txt", dir.path().display()))
        .args(["--continue-on-error", "--summary", "--output-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 successful, 1 failed"));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.contains("bad.txt,error"));
    assert!(summary.contains("no text recognized"));
}

#[test]
fn batch_without_matches_fails() {
    let dir = TempDir::new().unwrap();

    seikyu(dir.path())
        .arg("batch")
        .arg(format!("{}/*.txt", dir.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn config_init_set_and_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    seikyu(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    seikyu(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "extraction.default_tax_rate", "8"])
        .assert()
        .success();

    seikyu(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "extraction.default_tax_rate"])
        .assert()
        .success()
        .stdout(predicate::str::diff("8\n"));
}

#[test]
fn config_set_rejects_invalid_value() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    seikyu(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "extraction.max_line_items", "50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_line_items"));

    assert!(!config.exists());
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "config.json", "{}");

    seikyu(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

// dirs resolves XDG_CONFIG_HOME only on Linux.
#[cfg(target_os = "linux")]
#[test]
fn default_config_file_is_used() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("seikyu");
    fs::create_dir(&config_dir).unwrap();
    write(
        &config_dir,
        "config.json",
        r#"{"extraction": {"default_currency": "USD"}}"#,
    );
    let input = write(dir.path(), "invoice.pdf.txt", INVOICE);

    let output = seikyu(dir.path())
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["basic_info"]["currency"], "USD");
}
