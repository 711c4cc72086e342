//! `eligikit_io_xlsx` v1:
//! Typed-record to XLSX export kernel.
//!
//! Modules:
//! - `conf`     : Excel limits and default presets
//! - `spec`     : cell values/formats/options/report/errors
//! - `schema`   : column-descriptor tables and the `ExportRecord` trait
//! - `util`     : pure helper functions
//! - `exporter` : workbook-building kernel
pub mod conf;
pub mod exporter;
pub mod schema;
pub mod spec;
pub mod util;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
#[cfg(feature = "async")]
pub use exporter::export_records_async;
pub use exporter::{XlsxExporter, export_records, export_records_with_schema};
pub use schema::{ExportRecord, SpecColumnDescriptor, SpecRecordSchema};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumHeaderLabel, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecColumnPlan, SpecXlsxExportOptions, SpecXlsxExportOutput,
    SpecXlsxExportReport, SpecXlsxValuePolicy, XlsxExportError, XlsxExportResult,
};
pub use util::{plan_columns, sanitize_sheet_name};
