use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docqa_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docqa");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("sky.txt"),
        "The sky is blue.\nGrass is green.\nThe sun is a star.",
    )
    .unwrap();
    fs::write(files_dir.join("people.csv"), "name,role\nada,engineer\nlin,designer\n").unwrap();
    fs::write(files_dir.join("notes.md"), "# Not accepted\n").unwrap();
    fs::write(files_dir.join("big.txt"), "x".repeat(4096)).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/docqa.sqlite"

[ingest]
upload_dir = "{root}/uploads"
max_file_bytes = 2048

[llm]
provider = "disabled"

[logging]
level = "warn"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("docqa.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docqa_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docqa binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn file(config_path: &Path, name: &str) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("files")
        .join(name)
        .display()
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/docqa.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docqa(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docqa(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_text_file() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_docqa(&config_path, &["ingest", &file(&config_path, "sky.txt")]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("ingested 1 chunks"), "stdout={}", stdout);

    let saved: Vec<_> = fs::read_dir(tmp.path().join("uploads"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].ends_with("-sky.txt"));
}

#[test]
fn test_ingest_idempotent_reuses_collection() {
    let (_tmp, config_path) = setup_test_env();
    let path = file(&config_path, "sky.txt");

    let (first, _, ok1) = run_docqa(&config_path, &["ingest", &path]);
    assert!(ok1);
    let (second, stderr, ok2) = run_docqa(&config_path, &["ingest", &path]);
    assert!(ok2, "second ingest failed: {}", stderr);
    assert!(second.contains("already ingested"), "stdout={}", second);

    // Same content hash, same collection key
    let key = |s: &str| s.split_whitespace().find(|w| w.len() == 63).map(str::to_string);
    assert!(key(&first).is_some());
    assert_eq!(key(&first), key(&second));
}

#[test]
fn test_ingest_csv_as_text() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) =
        run_docqa(&config_path, &["ingest", &file(&config_path, "people.csv")]);
    assert!(success, "csv ingest failed: {}", stderr);
    assert!(stdout.contains("ingested 1 chunks"));
}

#[test]
fn test_unsupported_format_rejected() {
    let (tmp, config_path) = setup_test_env();
    let (_, stderr, success) =
        run_docqa(&config_path, &["ingest", &file(&config_path, "notes.md")]);
    assert!(!success);
    assert!(stderr.contains("unsupported file format"), "stderr={}", stderr);
    assert!(!tmp.path().join("uploads").exists());
}

#[test]
fn test_oversize_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_docqa(&config_path, &["ingest", &file(&config_path, "big.txt")]);
    assert!(!success);
    assert!(stderr.contains("limit is 2048 bytes"), "stderr={}", stderr);
}

#[test]
fn test_ask_fails_cleanly_without_model() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_docqa(
        &config_path,
        &["ask", &file(&config_path, "sky.txt"), "What color is the sky?"],
    );
    assert!(!success);
    assert!(stderr.contains("answer generation failed"), "stderr={}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let mut content = fs::read_to_string(&config_path).unwrap();
    content.push_str("\n[chunking]\nchunk_size = 100\nchunk_overlap = 150\n");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("chunk_overlap"), "stderr={}", stderr);
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_docqa(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
