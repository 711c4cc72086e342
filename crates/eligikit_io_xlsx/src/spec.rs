//! Shared XLSX export specification models.

use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::XlsxError;
use serde::Deserialize;
use thiserror::Error;

use crate::conf::{EnumFmtKey, derive_default_xlsx_format};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; `None` fields leave the library default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Raw cell value produced by a column accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Date with time of day.
    DateTime(NaiveDateTime),
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<&String> for EnumCellValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDate> for EnumCellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for EnumCellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// Largest integer magnitude an `f64` cell holds exactly (2^53).
pub const N_INT_EXACT_F64_MAX: u64 = 1 << 53;

macro_rules! impl_cell_value_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EnumCellValue {
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

// Integers wider than 2^53 are written as exact decimal text.
macro_rules! impl_cell_value_from_wide_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EnumCellValue {
                fn from(value: $ty) -> Self {
                    if (value.unsigned_abs() as u64) > N_INT_EXACT_F64_MAX {
                        Self::String(value.to_string())
                    } else {
                        Self::Number(value as f64)
                    }
                }
            }
        )*
    };
}

macro_rules! impl_cell_value_from_wide_unsigned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EnumCellValue {
                fn from(value: $ty) -> Self {
                    if (value as u64) > N_INT_EXACT_F64_MAX {
                        Self::String(value.to_string())
                    } else {
                        Self::Number(value as f64)
                    }
                }
            }
        )*
    };
}

impl_cell_value_from_number!(i8, i16, i32, u8, u16, u32, f32, f64);
impl_cell_value_from_wide_integer!(i64, isize);
impl_cell_value_from_wide_unsigned!(u64, usize);

impl<T> From<Option<T>> for EnumCellValue
where
    T: Into<EnumCellValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnPlanSpecification

/// Resolved column order for one export call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecColumnPlan {
    /// Schema descriptor indices in output order.
    pub cols_idx: Vec<usize>,
    /// Header labels aligned with `cols_idx`.
    pub labels: Vec<String>,
}

impl SpecColumnPlan {
    /// Number of planned columns.
    pub fn width(&self) -> usize {
        self.cols_idx.len()
    }

    /// Whether no column survived planning.
    pub fn is_empty(&self) -> bool {
        self.cols_idx.is_empty()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Which descriptor label goes into the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumHeaderLabel {
    /// Field name (default).
    #[default]
    FieldName,
    /// Display name, falling back to field name when absent.
    DisplayName,
}

/// Value conversion policy for missing/NaN/Inf cells.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecXlsxValuePolicy {
    /// Replacement text for missing value when keep-missing is enabled.
    pub missing_value_str: String,
    /// Replacement text for NaN.
    pub nan_str: String,
    /// Replacement text for positive infinity.
    pub posinf_str: String,
    /// Replacement text for negative infinity.
    pub neginf_str: String,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            missing_value_str: "NA".to_string(),
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
        }
    }
}

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy for one export call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Exporter-wide options controlling header, value conversion and formats.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecXlsxExportOptions {
    /// Header label source.
    pub header_label: EnumHeaderLabel,
    /// Freeze the header row.
    pub if_freeze_header: bool,
    /// Write missing values as `value_policy.missing_value_str` instead of blank.
    pub keep_missing_values: bool,
    /// Value conversion policy.
    pub value_policy: SpecXlsxValuePolicy,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Patch over the header preset.
    pub fmt_header: SpecCellFormat,
    /// Patch over the body preset for text, numbers and booleans.
    pub fmt_text: SpecCellFormat,
    /// Patch over the date preset.
    pub fmt_date: SpecCellFormat,
    /// Patch over the date-time preset.
    pub fmt_datetime: SpecCellFormat,
}

impl Default for SpecXlsxExportOptions {
    fn default() -> Self {
        Self {
            header_label: EnumHeaderLabel::FieldName,
            if_freeze_header: true,
            keep_missing_values: false,
            value_policy: SpecXlsxValuePolicy::default(),
            policy_autofit: SpecAutofitCellsPolicy::default(),
            fmt_header: SpecCellFormat::default(),
            fmt_text: SpecCellFormat::default(),
            fmt_date: SpecCellFormat::default(),
            fmt_datetime: SpecCellFormat::default(),
        }
    }
}

impl SpecXlsxExportOptions {
    /// Resolve the effective format for `key`: preset overlaid with the patch.
    pub fn resolve_format(&self, key: EnumFmtKey) -> SpecCellFormat {
        let fmt_patch = match key {
            EnumFmtKey::Header => &self.fmt_header,
            EnumFmtKey::Text => &self.fmt_text,
            EnumFmtKey::Date => &self.fmt_date,
            EnumFmtKey::DateTime => &self.fmt_datetime,
        };
        derive_default_xlsx_format(key).merge(fmt_patch)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-export call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxExportReport {
    /// Worksheet name as written.
    pub sheet_name: String,
    /// Header labels in column order.
    pub columns: Vec<String>,
    /// Number of data rows (header excluded).
    pub n_rows_data: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxExportReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Total worksheet rows including the header.
    pub fn n_rows_total(&self) -> usize {
        self.n_rows_data + 1
    }
}

/// Serialized workbook together with the report of the call that built it.
#[derive(Debug, Clone)]
pub struct SpecXlsxExportOutput {
    /// Workbook bytes, positioned at offset 0.
    pub document: Cursor<Vec<u8>>,
    /// Report of this export call.
    pub report: SpecXlsxExportReport,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Export call failures.
#[derive(Debug, Error)]
pub enum XlsxExportError {
    /// Column plan is empty, the schema is malformed or options are invalid.
    #[error("invalid export definition: {0}")]
    InvalidExportDefinition(String),
    /// Workbook could not be produced.
    #[error("export failure: {0}")]
    ExportFailure(String),
}

impl From<XlsxError> for XlsxExportError {
    fn from(err: XlsxError) -> Self {
        Self::ExportFailure(format!("xlsx write error: {err}"))
    }
}

/// Result alias for export calls.
pub type XlsxExportResult<T> = Result<T, XlsxExportError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::C_NUM_FORMAT_DATE;

    #[test]
    fn test_cell_value_from_option_maps_none_to_blank() {
        let v_none: Option<i32> = None;
        assert_eq!(EnumCellValue::from(v_none), EnumCellValue::None);
        assert_eq!(EnumCellValue::from(Some(3_u32)), EnumCellValue::Number(3.0));
        assert_eq!(
            EnumCellValue::from(Some("abc")),
            EnumCellValue::String("abc".to_string())
        );
    }

    #[test]
    fn test_format_merge_prefers_right_side() {
        let fmt_base = SpecCellFormat {
            bold: Some(false),
            font_size: Some(11),
            ..Default::default()
        };
        let fmt_merged = fmt_base.with_(SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        });
        assert_eq!(fmt_merged.bold, Some(true));
        assert_eq!(fmt_merged.font_size, Some(11));
    }

    #[test]
    fn test_export_options_load_from_toml_with_defaults() {
        let cfg: SpecXlsxExportOptions = toml::from_str(
            r##"
            header_label = "display_name"
            keep_missing_values = true

            [policy_autofit]
            rule_columns = "header"
            width_cell_max = 40

            [fmt_header]
            bold = true
            bg_color = "#DDEBF7"
            "##,
        )
        .expect("parse options");

        assert_eq!(cfg.header_label, EnumHeaderLabel::DisplayName);
        assert!(cfg.keep_missing_values);
        assert!(cfg.if_freeze_header);
        assert_eq!(cfg.policy_autofit.rule_columns, EnumAutofitColumnsRule::Header);
        assert_eq!(cfg.policy_autofit.width_cell_max, 40);
        assert_eq!(cfg.policy_autofit.width_cell_min, 8);
        assert_eq!(cfg.fmt_header.bg_color.as_deref(), Some("#DDEBF7"));
        assert_eq!(cfg.value_policy, SpecXlsxValuePolicy::default());
    }

    #[test]
    fn test_partial_format_config_keeps_presets() {
        let cfg: SpecXlsxExportOptions = toml::from_str(
            r##"
            [fmt_header]
            bg_color = "#DDEBF7"

            [fmt_date]
            font_color = "#1F4E78"
            "##,
        )
        .expect("parse options");

        let fmt_header = cfg.resolve_format(EnumFmtKey::Header);
        assert_eq!(fmt_header.bold, Some(true));
        assert_eq!(fmt_header.bg_color.as_deref(), Some("#DDEBF7"));

        let fmt_date = cfg.resolve_format(EnumFmtKey::Date);
        assert_eq!(fmt_date.num_format.as_deref(), Some(C_NUM_FORMAT_DATE));
        assert_eq!(fmt_date.font_color.as_deref(), Some("#1F4E78"));

        let fmt_datetime = cfg.resolve_format(EnumFmtKey::DateTime);
        assert_eq!(
            fmt_datetime,
            derive_default_xlsx_format(EnumFmtKey::DateTime)
        );
    }

    #[test]
    fn test_format_patch_can_override_preset_fields() {
        let cfg = SpecXlsxExportOptions {
            fmt_header: SpecCellFormat {
                bold: Some(false),
                ..Default::default()
            },
            fmt_date: SpecCellFormat {
                num_format: Some("dd/mm/yyyy".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(cfg.resolve_format(EnumFmtKey::Header).bold, Some(false));
        assert_eq!(
            cfg.resolve_format(EnumFmtKey::Date).num_format.as_deref(),
            Some("dd/mm/yyyy")
        );
    }

    #[test]
    fn test_wide_integers_beyond_f64_precision_become_text() {
        let n_exact = N_INT_EXACT_F64_MAX as i64;
        assert_eq!(
            EnumCellValue::from(n_exact),
            EnumCellValue::Number(n_exact as f64)
        );
        assert_eq!(
            EnumCellValue::from(n_exact + 1),
            EnumCellValue::String("9007199254740993".to_string())
        );
        assert_eq!(
            EnumCellValue::from(-(n_exact + 1)),
            EnumCellValue::String("-9007199254740993".to_string())
        );
        assert_eq!(
            EnumCellValue::from(u64::MAX),
            EnumCellValue::String(u64::MAX.to_string())
        );
        assert_eq!(EnumCellValue::from(42_usize), EnumCellValue::Number(42.0));
    }

    #[test]
    fn test_xlsx_error_maps_to_export_failure() {
        let err = XlsxExportError::from(XlsxError::RowColumnLimitError);
        assert!(matches!(err, XlsxExportError::ExportFailure(_)));
    }
}
