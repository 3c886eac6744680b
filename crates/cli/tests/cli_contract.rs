// Integration tests for the sgrid shell contract: single-JSON stdout for
// --json commands, stable exit codes, and the JSONL serve loop.
//
// Run with: cargo test -p salesgrid-cli --test cli_contract

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn sgrid(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sgrid"));
    cmd.current_dir(dir);
    // Keep the developer's own settings file out of the way.
    cmd.env("SALESGRID_CONFIG", dir.join("no-settings.toml"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Target plan and actual sales for one dealer with two sites:
/// S1 beats its target, S2 falls short.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("目標.csv"),
        "經銷商代碼,據點代碼,目標\nD1,S1,100\nD1,S2,50\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("實績.csv"),
        "經銷商代碼,營業所代碼,經銷商名稱,實績\nD1,S1,一號,70\nD1,S1,一號,50\nD1,S2,一號,40\n",
    )
    .unwrap();
    dir
}

fn path_str(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

/// Assert stdout is a single, parseable JSON value.
fn single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be one JSON value.\nParse error: {e}\nstdout:\n{trimmed}")
    })
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

// ===========================================================================
// reconcile
// ===========================================================================

#[test]
fn reconcile_json_reports_records_and_summary() {
    let dir = workspace();
    let output = sgrid(dir.path())
        .args(["reconcile", &path_str(&dir, "目標.csv"), &path_str(&dir, "實績.csv"), "--json"])
        .output()
        .unwrap();
    assert_exit(&output, 0);

    let val = single_json(&output);
    let recon = &val["reconciliation"];
    assert_eq!(recon["target_key"], "目標.csv::目標");
    assert_eq!(recon["actual_key"], "實績.csv::實績");
    assert_eq!(recon["merged_key"], "merged_目標.csv_實績.csv");
    assert_eq!(recon["record_count"], 2);
    assert_eq!(recon["met_count"], 1);
    assert_eq!(recon["records"][0]["actual_sales"], 120);
    assert_eq!(recon["records"][0]["met_target"], true);
    assert_eq!(recon["records"][1]["met_target"], false);

    let summary = &val["summary"];
    assert_eq!(summary["total_target"], 150);
    assert_eq!(summary["total_actual"], 160);
    assert_eq!(summary["met_rate"], 50.0);
}

#[test]
fn reconcile_with_dealer_filter() {
    let dir = workspace();
    let output = sgrid(dir.path())
        .args([
            "reconcile",
            &path_str(&dir, "目標.csv"),
            &path_str(&dir, "實績.csv"),
            "--dealer",
            "一號",
            "--json",
        ])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    let val = single_json(&output);
    assert_eq!(val["summary"]["dealer_filter"], "一號");
    assert_eq!(val["summary"]["record_count"], 2);
}

#[test]
fn unmatched_dealer_filter_exits_6() {
    let dir = workspace();
    let output = sgrid(dir.path())
        .args([
            "reconcile",
            &path_str(&dir, "目標.csv"),
            &path_str(&dir, "實績.csv"),
            "--dealer",
            "nobody",
        ])
        .output()
        .unwrap();
    assert_exit(&output, 6);
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_site_column_exits_5() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("實績.csv"),
        "經銷商代碼,實績\nD1,10\n",
    )
    .unwrap();
    let output = sgrid(dir.path())
        .args(["reconcile", &path_str(&dir, "目標.csv"), &path_str(&dir, "實績.csv")])
        .output()
        .unwrap();
    assert_exit(&output, 5);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("actual site code column"), "stderr: {stderr}");
}

#[test]
fn reconcile_writes_merged_csv() {
    let dir = workspace();
    let merged = path_str(&dir, "merged.csv");
    let output = sgrid(dir.path())
        .args([
            "reconcile",
            &path_str(&dir, "目標.csv"),
            &path_str(&dir, "實績.csv"),
            "--output",
            &merged,
        ])
        .output()
        .unwrap();
    assert_exit(&output, 0);

    let text = std::fs::read_to_string(&merged).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("經銷商代碼,營業所代碼,target_sales,經銷商名稱,actual_sales,達標")
    );
    assert_eq!(lines.next(), Some("D1,S1,100,一號,120,TRUE"));
    assert_eq!(lines.next(), Some("D1,S2,50,一號,40,FALSE"));
}

#[test]
fn unknown_sheet_exits_4() {
    let dir = workspace();
    let output = sgrid(dir.path())
        .args([
            "reconcile",
            &path_str(&dir, "目標.csv"),
            &path_str(&dir, "實績.csv"),
            "--target-sheet",
            "下半年",
        ])
        .output()
        .unwrap();
    assert_exit(&output, 4);
}

// ===========================================================================
// load / classify / preview
// ===========================================================================

#[test]
fn load_json_lists_every_sheet() {
    let dir = workspace();
    let output = sgrid(dir.path())
        .args(["load", &path_str(&dir, "目標.csv"), &path_str(&dir, "實績.csv"), "--json"])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    let val = single_json(&output);
    assert_eq!(val["count"], 2);
    assert_eq!(val["sheets"][1]["key"], "實績.csv::實績");
    assert_eq!(val["sheets"][1]["rows"], 3);
}

#[test]
fn classify_json_buckets_sources() {
    let dir = workspace();
    std::fs::write(dir.path().join("notes.csv"), "a,b\n1,2\n").unwrap();
    let output = sgrid(dir.path())
        .args([
            "classify",
            &path_str(&dir, "目標.csv"),
            &path_str(&dir, "實績.csv"),
            &path_str(&dir, "notes.csv"),
            "--json",
        ])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    let val = single_json(&output);
    assert_eq!(val["target"], serde_json::json!(["目標.csv"]));
    assert_eq!(val["actual"], serde_json::json!(["實績.csv"]));
    assert_eq!(val["unknown"], serde_json::json!(["notes.csv"]));
}

#[test]
fn preview_respects_row_count() {
    let dir = workspace();
    let output = sgrid(dir.path())
        .args(["preview", &path_str(&dir, "實績.csv"), "--rows", "2", "--json"])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    let val = single_json(&output);
    assert_eq!(val[0]["rows"], 3);
    assert_eq!(val[0]["sample_data"].as_array().unwrap().len(), 2);
}

#[test]
fn unsupported_file_exits_2() {
    let dir = workspace();
    std::fs::write(dir.path().join("report.pdf"), "%PDF").unwrap();
    let output = sgrid(dir.path())
        .args(["load", &path_str(&dir, "report.pdf")])
        .output()
        .unwrap();
    assert_exit(&output, 2);
}

#[test]
fn missing_file_exits_3() {
    let dir = workspace();
    let output = sgrid(dir.path())
        .args(["load", &path_str(&dir, "nope.csv")])
        .output()
        .unwrap();
    assert_exit(&output, 3);
}

// ===========================================================================
// resolve / rules
// ===========================================================================

fn write_mapping(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("codes.csv");
    std::fs::write(
        &path,
        "經銷商名稱,經銷商代碼,營業所名稱,營業所代碼\n一號,D1,北區,S1\n一號,D1,南區,S2\n",
    )
    .unwrap();
    path
}

#[test]
fn resolve_site_code() {
    let dir = workspace();
    let mapping = write_mapping(&dir);
    let output = sgrid(dir.path())
        .args(["resolve", "S2", "--mapping", mapping.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert_exit(&output, 0);
    let val = single_json(&output);
    assert_eq!(val["count"], 1);
    assert_eq!(val["matches"][0]["match_type"], "site");
    assert_eq!(val["matches"][0]["site_name"], "南區");
}

#[test]
fn resolve_without_mapping_exits_8() {
    let dir = workspace();
    let output = sgrid(dir.path()).args(["resolve", "D1"]).output().unwrap();
    assert_exit(&output, 8);
}

#[test]
fn resolve_unknown_code_exits_6() {
    let dir = workspace();
    let mapping = write_mapping(&dir);
    let output = sgrid(dir.path())
        .args(["resolve", "X9", "--mapping", mapping.to_str().unwrap()])
        .output()
        .unwrap();
    assert_exit(&output, 6);
}

#[test]
fn invalid_rules_exit_7() {
    let dir = workspace();
    let rules = dir.path().join("bad.rules.toml");
    std::fs::write(&rules, "[quantity]\ntarget = []\n").unwrap();
    let output = sgrid(dir.path())
        .args(["rules", "validate", rules.to_str().unwrap()])
        .output()
        .unwrap();
    assert_exit(&output, 7);
}

#[test]
fn rules_show_round_trips_through_validate() {
    let dir = workspace();
    let output = sgrid(dir.path()).args(["rules", "show"]).output().unwrap();
    assert_exit(&output, 0);
    let rules = dir.path().join("defaults.rules.toml");
    std::fs::write(&rules, &output.stdout).unwrap();

    let output = sgrid(dir.path())
        .args(["rules", "validate", rules.to_str().unwrap()])
        .output()
        .unwrap();
    assert_exit(&output, 0);
}

// ===========================================================================
// serve
// ===========================================================================

#[test]
fn serve_answers_each_line() {
    let dir = workspace();
    let mut child = sgrid(dir.path())
        .args([
            "serve",
            "--load",
            &path_str(&dir, "目標.csv"),
            "--load",
            &path_str(&dir, "實績.csv"),
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let requests = [
        r#"{"id":"1","tool":"list_and_classify","arguments":{}}"#,
        r#"{"id":"2","tool":"compare_target_vs_actual","arguments":{"target_key":"目標.csv::目標","actual_key":"實績.csv::實績"}}"#,
        r#"{"id":"3","tool":"summarize_performance","arguments":{"merged_key":"merged_目標.csv_實績.csv"}}"#,
        r#"{"id":"4","tool":"resolve_code","arguments":{"code":"D1"}}"#,
        r#"{"id":"5","tool":"no_such_tool","arguments":{}}"#,
    ];
    {
        let mut stdin = child.stdin.take().unwrap();
        for r in requests {
            writeln!(stdin, "{r}").unwrap();
        }
    }
    let output = child.wait_with_output().unwrap();
    assert_exit(&output, 0);

    let responses: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 5);
    assert_eq!(responses[0]["result"]["target"], serde_json::json!(["目標.csv"]));
    assert_eq!(responses[1]["result"]["met_count"], 1);
    assert_eq!(responses[2]["result"]["overall_rate"], 106.7);
    assert_eq!(responses[3]["error_kind"], "mapping_unavailable");
    assert_eq!(responses[4]["id"], "5");
    assert_eq!(responses[4]["error_kind"], "unknown_tool");
}

// ===========================================================================
// settings
// ===========================================================================

#[test]
fn settings_init_then_mapping_from_settings() {
    let dir = workspace();
    let mapping = write_mapping(&dir);
    let settings = dir.path().join("no-settings.toml");

    let output = sgrid(dir.path()).args(["settings", "init"]).output().unwrap();
    assert_exit(&output, 0);
    assert!(settings.exists());

    let output = sgrid(dir.path()).args(["settings", "init"]).output().unwrap();
    assert_exit(&output, 2);

    // Relative paths resolve against the settings file's directory.
    std::fs::write(&settings, "mapping_file = \"codes.csv\"\n").unwrap();
    assert!(mapping.exists());
    let output = sgrid(dir.path()).args(["resolve", "D1", "--json"]).output().unwrap();
    assert_exit(&output, 0);
    assert_eq!(single_json(&output)["count"], 2);
}
