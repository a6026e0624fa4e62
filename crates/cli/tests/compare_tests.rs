// Integration tests for `stockcheck compare`, `view` and `settings`.
// Run with: cargo test -p stockcheck-cli --test compare_tests -- --nocapture
//
// Fixtures are built with rust_xlsxwriter in a temp dir. Every command gets
// its own STOCKCHECK_CONFIG so the user's settings never leak in.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn stockcheck(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stockcheck"));
    cmd.current_dir(dir.path());
    cmd.env("STOCKCHECK_CONFIG", dir.path().join("settings.json"));
    cmd.env_remove("STOCKCHECK_LOG");
    cmd
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
    stockcheck(dir).args(args).output().expect("run stockcheck")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_sheet(
    wb: &mut Workbook,
    name: &str,
    qty_header: &str,
    rows: &[(&str, &str, f64)],
) {
    let ws = wb.add_worksheet();
    ws.set_name(name).unwrap();
    ws.write_string(0, 0, "Code article").unwrap();
    ws.write_string(0, 1, "Libelle").unwrap();
    ws.write_string(0, 2, qty_header).unwrap();
    for (i, (code, label, qty)) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        ws.write_string(r, 0, *code).unwrap();
        ws.write_string(r, 1, *label).unwrap();
        ws.write_number(r, 2, *qty).unwrap();
    }
}

/// 1001 differs, 3003 matches, 2002 only counted, 4004 only received.
fn stock_workbook(dir: &TempDir) -> PathBuf {
    let mut wb = Workbook::new();
    write_sheet(
        &mut wb,
        "Inventaire",
        "Qte inventaire",
        &[("1001", "Lait", 10.0), ("2002", "Beurre", 5.0), ("3003", "Oeufs", 4.0)],
    );
    write_sheet(
        &mut wb,
        "Reception",
        "Qte recue (UVC)",
        &[("1001", "Lait", 7.0), ("3003", "Oeufs", 4.0), ("4004", "Farine", 2.0)],
    );
    let path = dir.path().join("stock.xlsx");
    wb.save(&path).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// compare: plain tables
// ---------------------------------------------------------------------------

#[test]
fn compare_prints_partitions() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);
    let output = run(&dir, &["compare", arg(&book)]);

    assert!(output.status.success(), "exit code: {:?}\nstderr: {}",
        output.status, stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Articles communs (2 rows, 1 with differences)"), "got:\n{}", out);
    assert!(out.contains("Uniquement Inventaire (1 rows, 1 with differences)"));
    assert!(out.contains("Uniquement Réception (1 rows, 1 with differences)"));
    assert!(out.lines().any(|l| l.starts_with("* ") && l.contains("1001")));
    assert!(out.lines().any(|l| l.starts_with("  ") && l.contains("3003")));
    assert!(out.contains("4 rows, 3 with differences"));
    // Piped stdout never gets escape codes
    assert!(!out.contains('\u{1b}'));
}

#[test]
fn compare_filter_narrows_rows() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);
    let output = run(&dir, &["compare", arg(&book), "--filter", "LAIT"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("1001"));
    assert!(!out.contains("3003"));
    assert!(out.contains("1 rows, 1 with differences"));
}

#[test]
fn compare_invalid_filter_warns_and_shows_all() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);
    let output = run(&dir, &["compare", arg(&book), "--filter", "("]);

    assert!(output.status.success(), "invalid filter is not fatal");
    assert!(stderr(&output).contains("warning:"));
    assert!(stdout(&output).contains("4 rows, 3 with differences"));
}

#[test]
fn compare_max_rows_truncates() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);
    let output = run(&dir, &["compare", arg(&book), "--max-rows", "1"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("... (1 more rows)"));
}

#[test]
fn compare_fail_on_diff() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);

    let output = run(&dir, &["compare", arg(&book), "--fail-on-diff"]);
    assert_eq!(output.status.code(), Some(1));

    // Filtering down to the matching row clears the failure
    let output = run(&dir, &["compare", arg(&book), "--fail-on-diff", "-f", "oeufs"]);
    assert_eq!(output.status.code(), Some(0));
}

// ---------------------------------------------------------------------------
// compare: JSON
// ---------------------------------------------------------------------------

#[test]
fn compare_json_shape() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);
    let output = run(&dir, &["compare", arg(&book), "--json"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["meta"]["source"]["name"], "stock.xlsx");
    assert_eq!(json["filter"], "");
    assert_eq!(json["summary"]["total_rows"], 4);
    assert_eq!(json["summary"]["highlighted"], 3);
    assert_eq!(json["partitions"]["both"].as_array().unwrap().len(), 2);
    assert_eq!(json["partitions"]["inventory_only"][0]["code"], "2002");
    assert_eq!(json["partitions"]["reception_only"][0]["delta"], -2);
    assert_eq!(json["load"]["inventory"]["rows_kept"], 3);
    assert!(json.get("warning").is_none());
}

// ---------------------------------------------------------------------------
// compare: export
// ---------------------------------------------------------------------------

#[test]
fn compare_writes_highlighted_export() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);
    let out_path = dir.path().join("report.xlsx");
    let output = run(&dir, &["compare", arg(&book), "-o", arg(&out_path)]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("wrote"));

    let bytes = std::fs::read(&out_path).unwrap();
    let sheets = stockcheck_io::read_export(&bytes).unwrap();
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Articles_communs", "Inventaire_uniquement", "Reception_uniquement"]);

    let common = &sheets[0];
    assert_eq!(common.rows.len(), 2);
    assert_eq!(common.flagged.len(), 1);
    let flagged = common.flagged[0];
    assert_eq!(common.rows[flagged].code, "1001");
    assert_eq!(common.fill_for(flagged), Some(0xFFF2AC));
}

#[test]
fn compare_export_uses_configured_color() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        "// custom color\n{ \"report.highlightColor\": \"#FF8080\" }\n",
    )
    .unwrap();
    let book = stock_workbook(&dir);
    let out_path = dir.path().join("report.xlsx");
    let output = run(&dir, &["compare", arg(&book), "-o", arg(&out_path), "-q"]);

    assert!(output.status.success());
    assert!(stderr(&output).is_empty(), "quiet: {}", stderr(&output));

    let sheets = stockcheck_io::read_export(&std::fs::read(&out_path).unwrap()).unwrap();
    let common = &sheets[0];
    assert_eq!(common.fill_for(common.flagged[0]), Some(0xFF8080));
}

// ---------------------------------------------------------------------------
// compare: failures
// ---------------------------------------------------------------------------

#[test]
fn compare_missing_sheet_is_load_error() {
    let dir = TempDir::new().unwrap();
    let mut wb = Workbook::new();
    write_sheet(&mut wb, "Inventaire", "Qte inventaire", &[("1001", "Lait", 1.0)]);
    let path = dir.path().join("half.xlsx");
    wb.save(&path).unwrap();

    let output = run(&dir, &["compare", arg(&path)]);
    assert_eq!(output.status.code(), Some(3));
    let err = stderr(&output);
    assert!(err.contains("sheet 'Reception' not found"), "stderr: {}", err);
    assert!(err.contains("hint:"));
}

#[test]
fn compare_missing_column_is_load_error() {
    let dir = TempDir::new().unwrap();
    let mut wb = Workbook::new();
    write_sheet(&mut wb, "Inventaire", "Quantite", &[("1001", "Lait", 1.0)]);
    write_sheet(&mut wb, "Reception", "Qte recue (UVC)", &[("1001", "Lait", 1.0)]);
    let path = dir.path().join("cols.xlsx");
    wb.save(&path).unwrap();

    let output = run(&dir, &["compare", arg(&path)]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("missing column 'Qte inventaire'"));
}

#[test]
fn compare_garbage_file_is_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.xlsx");
    std::fs::write(&path, b"this is not a workbook").unwrap();

    let output = run(&dir, &["compare", arg(&path)]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).starts_with("error:"));
}

#[test]
fn compare_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &["compare", "does-not-exist.xlsx"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("cannot read"));
}

#[test]
fn no_subcommand_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Usage:"));
}

// ---------------------------------------------------------------------------
// view / settings
// ---------------------------------------------------------------------------

#[test]
fn view_without_terminal_prints_tables() {
    let dir = TempDir::new().unwrap();
    let book = stock_workbook(&dir);
    let output = run(&dir, &["view", arg(&book)]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Articles communs (2 rows, 1 with differences)"));
}

#[test]
fn settings_prints_path_and_creates_defaults() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &["settings"]);
    assert!(output.status.success());
    let expected = dir.path().join("settings.json");
    assert_eq!(stdout(&output).trim(), expected.to_string_lossy());

    let output = run(&dir, &["settings", "--show"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["report.highlightColor"], "#FFF2AC");
    assert_eq!(json["export.fileName"], "Comparaison_Inventaire_Reception.xlsx");
    assert!(expected.exists(), "default settings file is created on load");
}
