// stockcheck compare - reconcile one workbook and print or export the report

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use stockcheck_config::Settings;
use stockcheck_io::{ExportOptions, Upload};
use stockcheck_recon::{Evaluation, FilterError};

use crate::exit_codes::EXIT_DIFFS;
use crate::tui::data::{column_align, partition_tabs};
use crate::util;
use crate::CliError;

pub struct CompareArgs {
    pub file: PathBuf,
    pub filter: String,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub max_rows: Option<usize>,
    pub fail_on_diff: bool,
    pub quiet: bool,
}

pub fn cmd_compare(args: CompareArgs) -> Result<(), CliError> {
    let settings = Settings::load();
    let upload = load_upload(&args.file)?;
    let bundle = upload
        .report(&args.filter, &export_options(&settings))
        .map_err(|e| CliError::recon(&e))?;

    if let Some(warning) = &bundle.evaluation.warning {
        print_filter_warning(warning);
    }

    if args.json {
        let json = serde_json::to_string_pretty(&bundle)
            .map_err(|e| CliError::export(format!("failed to serialize report: {}", e)))?;
        println!("{}", json);
    } else {
        let max_rows = args.max_rows.or(settings.max_rows).unwrap_or(0);
        let highlight = atty::is(atty::Stream::Stdout).then(|| settings.highlight_rgb());
        let stdout = io::stdout();
        let mut w = stdout.lock();
        print_plain(&mut w, &bundle.evaluation, max_rows, highlight)
            .map_err(|e| CliError::io(format!("failed to write output: {}", e)))?;
    }

    if let Some(path) = &args.output {
        bundle
            .write_export(path)
            .map_err(|e| CliError::io(format!("failed to write {}: {}", path.display(), e)))?;
        if !args.quiet {
            eprintln!(
                "wrote {} ({} rows, {} sheets)",
                path.display(),
                bundle.export_result.rows_exported,
                bundle.export_result.sheets_exported
            );
        }
    }

    if args.fail_on_diff && bundle.evaluation.summary.has_differences() {
        return Err(CliError { code: EXIT_DIFFS, message: String::new(), hint: None });
    }
    Ok(())
}

/// Read and reconcile the workbook, mapping failures to exit codes.
pub(crate) fn load_upload(path: &Path) -> Result<Upload, CliError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Upload::from_bytes(name, &bytes).map_err(|e| {
        let err = CliError::recon(&e);
        match e {
            stockcheck_recon::ReconError::SheetMissing { .. } => {
                err.with_hint("the workbook needs sheets named 'Inventaire' and 'Reception'")
            }
            stockcheck_recon::ReconError::MissingColumn { .. } => {
                err.with_hint("column names are matched exactly after trimming spaces")
            }
            _ => err,
        }
    })
}

pub(crate) fn export_options(settings: &Settings) -> ExportOptions {
    ExportOptions {
        highlight_rgb: settings.highlight_rgb(),
        freeze_header: settings.freeze_header,
        autofilter: settings.autofilter,
    }
}

pub(crate) fn print_filter_warning(warning: &FilterError) {
    eprintln!("warning: {}; showing all rows", warning);
}

/// Print every partition as a plain text table.
///
/// Rows with differing quantities are marked `*` in the gutter and, when
/// `highlight` is set, painted with that background color.
pub fn print_plain<W: Write>(
    w: &mut W,
    evaluation: &Evaluation,
    max_rows: usize,
    highlight: Option<u32>,
) -> io::Result<()> {
    for (i, tab) in partition_tabs(evaluation, max_rows).iter().enumerate() {
        let data = &tab.data;
        if i > 0 {
            writeln!(w)?;
        }
        writeln!(
            w,
            "{} ({} rows, {} with differences)",
            tab.title,
            data.total_rows,
            evaluation.summary.counts(tab.membership).map(|c| c.highlighted).unwrap_or(0)
        )?;

        let cell = |c: usize, value: &str| {
            let cw = data.col_widths.get(c).copied().unwrap_or(3);
            util::fit(value, cw, column_align(c))
        };

        // Header
        let header: Vec<String> = (0..data.num_cols)
            .map(|c| cell(c, data.col_names.get(c).map(|s| s.as_str()).unwrap_or("?")))
            .collect();
        writeln!(w, "  {}", header.join(" "))?;

        // Separator
        let sep: Vec<String> = data.col_widths.iter().map(|cw| "-".repeat(*cw)).collect();
        writeln!(w, "  {}", sep.join(" "))?;

        // Rows
        for (r, row) in data.rows.iter().enumerate() {
            let line: Vec<String> = (0..data.num_cols)
                .map(|c| cell(c, row.get(c).map(|s| s.as_str()).unwrap_or("")))
                .collect();
            let line = line.join(" ");
            let flagged = data.highlighted.get(r).copied().unwrap_or(false);
            match (flagged, highlight) {
                (true, Some(rgb)) => {
                    queue!(
                        w,
                        Print("* "),
                        SetBackgroundColor(Color::Rgb {
                            r: (rgb >> 16) as u8,
                            g: (rgb >> 8) as u8,
                            b: rgb as u8,
                        }),
                        SetForegroundColor(Color::Black),
                        Print(line),
                        ResetColor,
                        Print("\n")
                    )?;
                }
                (true, None) => writeln!(w, "* {}", line)?,
                (false, _) => writeln!(w, "  {}", line)?,
            }
        }

        if data.is_truncated() {
            writeln!(w, "  ... ({} more rows)", data.total_rows - data.num_rows)?;
        }
    }

    let summary = &evaluation.summary;
    writeln!(w)?;
    writeln!(w, "{} rows, {} with differences", summary.total_rows, summary.highlighted)?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcheck_recon::{run, RawCell, RawSheet, RawWorkbook};

    fn evaluation(filter: &str) -> Evaluation {
        let t = |s: &str| RawCell::Text(s.into());
        let n = RawCell::Number;
        let workbook = RawWorkbook {
            sheets: vec![
                RawSheet::new(
                    "Inventaire",
                    vec!["Code article".into(), "Libelle".into(), "Qte inventaire".into()],
                    vec![
                        vec![t("1001"), t("Lait"), n(10.0)],
                        vec![t("2002"), t("Beurre"), n(5.0)],
                        vec![t("3003"), t("Oeufs"), n(4.0)],
                    ],
                ),
                RawSheet::new(
                    "Reception",
                    vec!["Code article".into(), "Libelle".into(), "Qte recue (UVC)".into()],
                    vec![vec![t("1001"), t("Lait"), n(7.0)], vec![t("3003"), t("Oeufs"), n(4.0)]],
                ),
            ],
        };
        run(&workbook, filter).unwrap()
    }

    fn render(eval: &Evaluation, max_rows: usize, highlight: Option<u32>) -> String {
        let mut out = Vec::new();
        print_plain(&mut out, eval, max_rows, highlight).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn plain_marks_differences() {
        let out = render(&evaluation(""), 0, None);
        assert!(out.contains("Articles communs (2 rows, 1 with differences)"));
        assert!(out.contains("Uniquement Réception (0 rows, 0 with differences)"));
        let lait = out.lines().find(|l| l.contains("1001")).unwrap();
        assert!(lait.starts_with("* "));
        let oeufs = out.lines().find(|l| l.contains("3003")).unwrap();
        assert!(oeufs.starts_with("  "));
        assert!(out.ends_with("3 rows, 2 with differences\n"));
        assert!(!out.contains('\u{1b}'));
    }

    #[test]
    fn plain_truncates() {
        let out = render(&evaluation(""), 1, None);
        assert!(out.contains("... (1 more rows)"));
        assert!(!out.contains("3003"));
    }

    #[test]
    fn highlight_uses_ansi_background() {
        let out = render(&evaluation(""), 0, Some(0xFFF2AC));
        assert!(out.contains("\u{1b}[48;2;255;242;172m"));
    }

    proptest::proptest! {
        #[test]
        fn one_marker_per_highlighted_row(
            quantities in proptest::collection::vec((0i64..5, 0i64..5), 0..20)
        ) {
            let t = |s: String| RawCell::Text(s);
            let inv = quantities.iter().enumerate()
                .map(|(i, (q, _))| vec![t(format!("{}", i)), t("x".into()), RawCell::Number(*q as f64)])
                .collect();
            let rec = quantities.iter().enumerate()
                .map(|(i, (_, q))| vec![t(format!("{}", i)), t("x".into()), RawCell::Number(*q as f64)])
                .collect();
            let workbook = RawWorkbook {
                sheets: vec![
                    RawSheet::new("Inventaire", vec!["Code article".into(), "Libelle".into(), "Qte inventaire".into()], inv),
                    RawSheet::new("Reception", vec!["Code article".into(), "Libelle".into(), "Qte recue (UVC)".into()], rec),
                ],
            };
            let eval = run(&workbook, "").unwrap();
            let out = render(&eval, 0, None);
            let marked = out.lines().filter(|l| l.starts_with("* ")).count();
            let expected = quantities.iter().filter(|(a, b)| a != b).count();
            proptest::prop_assert_eq!(marked, expected);
            proptest::prop_assert_eq!(eval.summary.highlighted, expected);
        }
    }
}
