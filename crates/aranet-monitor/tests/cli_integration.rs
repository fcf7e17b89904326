//! CLI Integration Tests
//!
//! These tests run the binary against a temporary database and config file,
//! so no hardware is needed.
//!
//! ```
//! cargo test --package aranet-monitor --test cli_integration
//! ```

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const SAMPLE_CSV: &str = "\
Time(MM/DD/YYYY hh:mm:ss),Carbon dioxide(ppm),Temperature(°C),Relative humidity(%),Atmospheric pressure(hPa)
\"05/01/2024 08:00:00\",\"812\",\"20\",\"42\",\"1011.5\"
\"05/01/2024 08:05:00\",\"845\",\"21.5\",\"43\",\"1011.4\"
\"05/01/2024 08:10:00\",\"900\",\"22\",\"44\",\"1011.2\"
";

/// A scratch directory holding the database and config file.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn write_sample(&self) -> std::path::PathBuf {
        let path = self.path("sample.csv");
        fs::write(&path, SAMPLE_CSV).unwrap();
        path
    }

    /// Run the binary isolated from the user's config, database and env.
    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_aranet-monitor"))
            .args(args)
            .arg("--no-color")
            .env("ARANET_CONFIG", self.path("config.toml"))
            .env("ARANET_DB", self.path("history.db"))
            .env_remove("ARANET_MAC")
            .env_remove("PUSHOVER_TOKEN")
            .env_remove("PUSHOVER_USER")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run aranet-monitor binary")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_lists_commands() {
    let ws = Workspace::new();
    let stdout = ws.run_ok(&["--help"]);

    for command in ["watch", "sync", "history", "scan", "import", "export", "config"] {
        assert!(stdout.contains(command), "Help should list {}", command);
    }
}

#[test]
fn test_version() {
    let ws = Workspace::new();
    let stdout = ws.run_ok(&["--version"]);
    assert!(stdout.starts_with("aranet-monitor "));
}

#[test]
fn test_unknown_command_fails() {
    let ws = Workspace::new();
    assert!(!ws.run(&["read"]).status.success());
}

// =============================================================================
// History exchange
// =============================================================================

#[test]
fn test_import_then_summarize() {
    let ws = Workspace::new();
    let csv = ws.write_sample();

    let stdout = ws.run_ok(&["import", path_str(&csv)]);
    assert_eq!(stdout.trim(), "Read 3 records: 3 new, 0 already recorded");

    // Importing the same file again adds nothing
    let stdout = ws.run_ok(&["import", path_str(&csv)]);
    assert_eq!(stdout.trim(), "Read 3 records: 0 new, 3 already recorded");

    let stdout = ws.run_ok(&["history", "--json"]);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["stats"]["count"], 3);
    assert_eq!(summary["stats"]["co2"]["min"], 812.0);
    assert_eq!(summary["stats"]["co2"]["max"], 900.0);
    assert_eq!(summary["latest"]["co2"], 900);
    assert_eq!(summary["latest"]["timestamp"], "2024-05-01T08:10:00Z");

    let stdout = ws.run_ok(&["history"]);
    assert!(stdout.contains("records"));
    assert!(stdout.contains("temp  humid  press    co2"));
    assert!(stdout.lines().any(|l| l.starts_with("max") && l.ends_with("900")));
}

#[test]
fn test_list_records() {
    let ws = Workspace::new();
    let csv = ws.write_sample();
    ws.run_ok(&["import", path_str(&csv), "-q"]);

    let stdout = ws.run_ok(&["history", "--list", "--json", "-n", "2"]);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    // Newest first
    assert_eq!(records[0]["co2"], 900);
    assert_eq!(records[1]["co2"], 845);

    let stdout = ws.run_ok(&[
        "history",
        "--list",
        "--json",
        "--since",
        "2024-05-01T08:01:00Z",
        "--until",
        "2024-05-01T08:06:00Z",
    ]);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["co2"], 845);

    let stdout = ws.run_ok(&["history", "--list", "-n", "0"]);
    assert!(stdout.contains("812 ppm"));
    assert!(stdout.contains("900 ppm"));
}

#[test]
fn test_export_writes_exchange_file() {
    let ws = Workspace::new();
    let csv = ws.write_sample();
    ws.run_ok(&["import", path_str(&csv), "-q"]);

    let out = ws.path("export.csv");
    let stdout = ws.run_ok(&["export", path_str(&out)]);
    assert!(stdout.starts_with("Exported 3 records"));

    let exported = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = exported.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("Carbon dioxide(ppm)"));
    assert_eq!(
        lines[1],
        "\"05/01/2024 08:00:00\",\"812\",\"20\",\"42\",\"1011.5\""
    );
}

#[test]
fn test_export_custom_date_format() {
    let ws = Workspace::new();
    let csv = ws.write_sample();
    ws.run_ok(&["import", path_str(&csv), "-q"]);

    let out = ws.path("export.csv");
    ws.run_ok(&[
        "export",
        path_str(&out),
        "--date-format",
        "[year]-[month]-[day] [hour]:[minute]:[second]",
        "-q",
    ]);

    let exported = fs::read_to_string(&out).unwrap();
    assert!(exported.contains("\"2024-05-01 08:10:00\",\"900\""));
}

#[test]
fn test_import_rejects_bad_date_format() {
    let ws = Workspace::new();
    let csv = ws.write_sample();

    let output = ws.run(&["import", path_str(&csv), "--date-format", "[month/[day]"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid date format"));
}

#[test]
fn test_import_missing_file_fails() {
    let ws = Workspace::new();
    let missing = ws.path("missing.csv");
    assert!(!ws.run(&["import", path_str(&missing)]).status.success());
}

#[test]
fn test_empty_history() {
    let ws = Workspace::new();
    let stdout = ws.run_ok(&["history"]);
    assert!(stdout.contains("never"));

    let stdout = ws.run_ok(&["history", "--list"]);
    assert_eq!(stdout, "No history records found.\n");
}

#[test]
fn test_history_rejects_bad_since() {
    let ws = Workspace::new();
    let output = ws.run(&["history", "--list", "--since", "yesterday"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid date format"));
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_path_honors_env() {
    let ws = Workspace::new();
    let stdout = ws.run_ok(&["config", "path"]);
    assert_eq!(stdout.trim(), path_str(&ws.path("config.toml")));
}

#[test]
fn test_config_init_and_show() {
    let ws = Workspace::new();
    ws.run_ok(&["config", "init"]);
    assert!(ws.path("config.toml").exists());

    // A second init needs --force
    assert!(!ws.run(&["config", "init"]).status.success());
    ws.run_ok(&["config", "init", "--force"]);

    let stdout = ws.run_ok(&["config", "show"]);
    assert!(stdout.contains("gap_policy = \"skip-persist\""));
    assert!(stdout.contains("co2_rising_above = 1400"));
}

#[test]
fn test_config_file_sets_date_format() {
    let ws = Workspace::new();
    fs::write(
        ws.path("config.toml"),
        "date_format = \"[year]-[month]-[day] [hour]:[minute]:[second]\"\n",
    )
    .unwrap();

    let csv = ws.path("iso.csv");
    fs::write(
        &csv,
        "header,a,b,c,d\n\"2024-05-01 08:00:00\",\"700\",\"19\",\"40\",\"1009\"\n",
    )
    .unwrap();

    let stdout = ws.run_ok(&["import", path_str(&csv)]);
    assert_eq!(stdout.trim(), "Read 1 records: 1 new, 0 already recorded");
}

#[test]
fn test_invalid_config_is_fatal() {
    let ws = Workspace::new();
    fs::write(
        ws.path("config.toml"),
        "database = \"/data/a.db\"\n\n[alerts]\nlow_temperature = 95.0\n",
    )
    .unwrap();

    let output = ws.run(&["history"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid config file"));
    // Failed before any database was opened
    assert!(!ws.path("history.db").exists());

    let csv = ws.write_sample();
    assert!(!ws.run(&["import", path_str(&csv)]).status.success());
    assert!(!ws.path("history.db").exists());
}

#[test]
fn test_broken_config_can_be_replaced() {
    let ws = Workspace::new();
    fs::write(ws.path("config.toml"), "gap_policy = 7\n").unwrap();

    assert!(!ws.run(&["config", "show"]).status.success());
    let stdout = ws.run_ok(&["config", "path"]);
    assert_eq!(stdout.trim(), path_str(&ws.path("config.toml")));

    ws.run_ok(&["config", "init", "--force"]);
    ws.run_ok(&["history"]);
}

// =============================================================================
// Completions
// =============================================================================

#[test]
fn test_completions() {
    let ws = Workspace::new();
    let stdout = ws.run_ok(&["completions", "bash"]);
    assert!(stdout.contains("aranet-monitor"));
}
