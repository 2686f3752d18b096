//! Integration tests for `sassbase load`.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "sassbase-cli", "--bin", "sassbase", "--"]);
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_load_rebases_against_entry() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/main.scss", "@use 'parts/nav';");
    write(
        dir.path(),
        "src/parts/_nav.scss",
        ".nav { background: url(../img/bg.png); icon: url(data:image/png;base64,AA); }",
    );

    let output = cargo_bin()
        .arg("--cwd")
        .arg(dir.path())
        .args([
            "--json",
            "load",
            "src/parts/_nav.scss",
            "--entry",
            "src/main.scss",
        ])
        .output()
        .expect("Failed to run load command");
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(json["dialect"], "scss");
    assert_eq!(json["rewrites"], 1);
    let content = json["content"].as_str().unwrap();
    assert!(content.contains("url(img/bg.png)"), "content: {content}");
    assert!(content.contains("url(data:image/png;base64,AA)"));
}

#[test]
fn test_load_uses_configured_entry_and_writes_output() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sassbase.json", r#"{ "entry": "styles/app.scss" }"#);
    write(dir.path(), "styles/app.scss", "");
    write(dir.path(), "styles/blocks/_card.sass", ".card\n  background: url(\"art/card.svg\")\n");

    let output = cargo_bin()
        .arg("--cwd")
        .arg(dir.path())
        .args(["load", "styles/blocks/_card.sass", "-o", "out/card.sass"])
        .output()
        .expect("Failed to run load command");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let written = fs::read_to_string(dir.path().join("out/card.sass")).unwrap();
    assert_eq!(written, ".card\n  background: url(blocks/art/card.svg)\n");
}

#[test]
fn test_load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = cargo_bin()
        .arg("--cwd")
        .arg(dir.path())
        .args(["load", "nope.scss"])
        .output()
        .expect("Failed to run load command");
    assert!(!output.status.success());
}
