use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn localtools(config_dir: &std::path::Path) -> Command {
    let config = config_dir.join("config.toml");
    if !config.exists() {
        fs::write(
            &config,
            format!(
                "[backup]\ndirectory = {:?}\n",
                config_dir.join("backups").to_string_lossy()
            ),
        )
        .unwrap();
    }
    let mut cmd = Command::cargo_bin("localtools").unwrap();
    cmd.arg("--config").arg(&config);
    cmd
}

#[test]
fn search_prints_grouped_report() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("tree");
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src/main.rs"), "fn main() {\n    todo!()\n}\n")?;

    localtools(dir.path())
        .arg("search")
        .arg("todo")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 matches in 1 files"))
        .stdout(predicate::str::contains("src/main.rs (1 matches)"))
        .stdout(predicate::str::contains("Line 2, column 5:"));
    Ok(())
}

#[test]
fn replace_is_a_dry_run_until_applied() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("tree");
    fs::create_dir_all(&root)?;
    let file = root.join("notes.txt");
    fs::write(&file, "alpha beta alpha\n")?;

    localtools(dir.path())
        .args(["replace", "alpha", "gamma"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"))
        .stdout(predicate::str::contains("Would make 2 replacements in 1 files"));
    assert_eq!(fs::read_to_string(&file)?, "alpha beta alpha\n");

    localtools(dir.path())
        .args(["replace", "alpha", "gamma", "--apply"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Made 2 replacements in 1 files"));
    assert_eq!(fs::read_to_string(&file)?, "gamma beta gamma\n");
    assert_eq!(fs::read_dir(dir.path().join("backups"))?.count(), 1);
    Ok(())
}

#[test]
fn missing_root_fails_with_message() {
    let dir = tempdir().unwrap();
    localtools(dir.path())
        .args(["search", "x", "/definitely/not/here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn serve_answers_one_response_per_line() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("hello.txt");
    fs::write(&target, "hi\n").unwrap();
    let input = format!(
        "{}\n{}\nnot json\n",
        serde_json::json!({"id": 1, "tool": "read_file", "params": {"file_path": target}}),
        serde_json::json!({"id": "b", "tool": "run_command", "params": {"command": "sudo ls"}}),
    );

    let output = localtools(dir.path())
        .arg("serve")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let responses: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["ok"], true);
    assert!(responses[0]["output"].as_str().unwrap().contains("hi"));
    assert_eq!(responses[1]["id"], "b");
    assert_eq!(responses[1]["ok"], false);
    assert!(
        responses[1]["output"]
            .as_str()
            .unwrap()
            .starts_with("Error: Command not allowed")
    );
    assert_eq!(responses[2]["ok"], false);
}

#[test]
fn config_init_writes_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out/config.toml");
    localtools(dir.path())
        .args(["config", "--init"])
        .arg(&path)
        .assert()
        .success();
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("max_results = 1000"));
    assert!(written.contains("timeout_secs = 30"));
}
