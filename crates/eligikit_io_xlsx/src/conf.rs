//! XLSX constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{SpecCellFormat, SpecXlsxExportOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Excel column width hard cap.
pub const N_WIDTH_EXCEL_COLUMN_MAX: usize = 255;

/// Number format used for date cells.
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd";
/// Number format used for date-time cells.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd hh:mm:ss";

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Generic body cell format.
    Text,
    /// Date cell format.
    Date,
    /// Date-time cell format.
    DateTime,
    /// Header cell format.
    Header,
}

impl EnumFmtKey {
    /// Preset map key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Header => "header",
        }
    }
}

/// Build default named format presets used by [`crate::exporter::XlsxExporter`].
pub fn derive_default_xlsx_formats() -> BTreeMap<String, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat::default();

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(
        EnumFmtKey::Text.as_str().to_string(),
        cfg_base_fmt_spec.clone(),
    );
    dict_fmt.insert(
        EnumFmtKey::Header.as_str().to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::Date.as_str().to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DATE.to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::DateTime.as_str().to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DATETIME.to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}

/// Look up one default preset by key.
pub fn derive_default_xlsx_format(key: EnumFmtKey) -> SpecCellFormat {
    derive_default_xlsx_formats()
        .remove(key.as_str())
        .unwrap_or_default()
}

/// Build default export options.
pub fn derive_default_xlsx_export_options() -> SpecXlsxExportOptions {
    SpecXlsxExportOptions::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header_preset_is_bold() {
        let fmt_header = derive_default_xlsx_format(EnumFmtKey::Header);
        assert_eq!(fmt_header.bold, Some(true));
        assert_eq!(fmt_header.num_format, None);
    }

    #[test]
    fn test_default_date_presets_carry_number_formats() {
        let dict_fmt = derive_default_xlsx_formats();
        assert_eq!(dict_fmt.len(), 4);
        assert_eq!(
            dict_fmt["date"].num_format.as_deref(),
            Some(C_NUM_FORMAT_DATE)
        );
        assert_eq!(
            dict_fmt["datetime"].num_format.as_deref(),
            Some(C_NUM_FORMAT_DATETIME)
        );
        assert_eq!(dict_fmt["text"], SpecCellFormat::default());
    }

    #[test]
    fn test_default_export_options_use_presets() {
        let cfg = derive_default_xlsx_export_options();
        assert_eq!(cfg.fmt_header, SpecCellFormat::default());
        assert_eq!(
            cfg.resolve_format(EnumFmtKey::Header),
            derive_default_xlsx_format(EnumFmtKey::Header)
        );
        assert_eq!(
            cfg.resolve_format(EnumFmtKey::Date),
            derive_default_xlsx_format(EnumFmtKey::Date)
        );
        assert!(cfg.if_freeze_header);
        assert!(!cfg.keep_missing_values);
    }
}
