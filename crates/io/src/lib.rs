// Workbook I/O: spreadsheet import, highlighted report export and read-back

pub mod report;
pub mod xlsx;
pub mod xlsx_highlight;
pub mod xlsx_styles;

pub use report::{build_report, ReportBundle, SourceInfo, Upload};
pub use xlsx::{export_report, read_export, read_workbook, ExportOptions, ExportedSheet};
