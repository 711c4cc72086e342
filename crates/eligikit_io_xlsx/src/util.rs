//! Stateless helper utilities used by the XLSX export kernel.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::conf::{
    C_NUM_FORMAT_DATE, C_NUM_FORMAT_DATETIME, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_WIDTH_EXCEL_COLUMN_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::schema::SpecRecordSchema;
use crate::spec::{
    EnumCellValue, EnumHeaderLabel, SpecAutofitCellsPolicy, SpecColumnPlan, SpecXlsxExportReport,
    SpecXlsxValuePolicy, XlsxExportError, XlsxExportResult,
};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnPlanning

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> XlsxExportResult<()> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(XlsxExportError::InvalidExportDefinition(format!(
        "Duplicate field names detected: {c_msg}"
    )))
}

/// Resolve the ordered column plan for `schema` minus `cols_excluded`.
///
/// When any surviving field carries a display order, columns sort by
/// `(order, name)` with unordered fields last; otherwise declaration order
/// is kept. Excluded names missing from the schema are reported as warnings.
pub fn plan_columns<T>(
    schema: &SpecRecordSchema<T>,
    cols_excluded: Option<&BTreeSet<String>>,
    header_label: EnumHeaderLabel,
    report: &mut SpecXlsxExportReport,
) -> XlsxExportResult<SpecColumnPlan> {
    validate_unique_columns(&schema.names())?;

    if let Some(set_excluded) = cols_excluded {
        for c_name in set_excluded {
            if !schema.columns().iter().any(|col| col.name() == c_name) {
                debug!(field = %c_name, "excluded field not found in schema");
                report.warn(format!("Excluded field not found: {c_name:?}"));
            }
        }
    }

    let mut l_cols_idx: Vec<usize> = schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, col)| {
            cols_excluded.is_none_or(|set_excluded| !set_excluded.contains(col.name()))
        })
        .map(|(n_idx, _)| n_idx)
        .collect();

    if l_cols_idx.is_empty() {
        return Err(XlsxExportError::InvalidExportDefinition(format!(
            "No exportable fields remain (declared={}, excluded={}).",
            schema.len(),
            cols_excluded.map_or(0, BTreeSet::len)
        )));
    }
    if l_cols_idx.len() > N_NCOLS_EXCEL_MAX {
        return Err(XlsxExportError::InvalidExportDefinition(format!(
            "Column plan width {} exceeds Excel limit {N_NCOLS_EXCEL_MAX}.",
            l_cols_idx.len()
        )));
    }

    let l_cols = schema.columns();
    if l_cols_idx.iter().any(|n_idx| l_cols[*n_idx].order().is_some()) {
        l_cols_idx.sort_by(|a, b| {
            let (col_a, col_b) = (&l_cols[*a], &l_cols[*b]);
            (col_a.order().is_none(), col_a.order(), col_a.name()).cmp(&(
                col_b.order().is_none(),
                col_b.order(),
                col_b.name(),
            ))
        });
    }

    let labels = l_cols_idx
        .iter()
        .map(|n_idx| {
            let col = &l_cols[*n_idx];
            match header_label {
                EnumHeaderLabel::FieldName => col.name().to_string(),
                EnumHeaderLabel::DisplayName => {
                    col.display_name().unwrap_or(col.name()).to_string()
                }
            }
        })
        .collect();

    Ok(SpecColumnPlan {
        cols_idx: l_cols_idx,
        labels,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; return `None` for finite values.
pub fn convert_nan_inf_to_str(x: f64, value_policy: &SpecXlsxValuePolicy) -> Option<String> {
    if x.is_nan() {
        return Some(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    None
}

/// Normalize one raw cell value into something the workbook can store.
///
/// Non-finite numbers become policy text. Missing values become the policy
/// missing text only when `if_keep_missing_values` is set.
pub fn convert_cell_value(
    value: EnumCellValue,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::None if if_keep_missing_values => {
            EnumCellValue::String(value_policy.missing_value_str.clone())
        }
        EnumCellValue::Number(n) => match convert_nan_inf_to_str(n, value_policy) {
            Some(c_text) => EnumCellValue::String(c_text),
            None => EnumCellValue::Number(n),
        },
        other => other,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate displayed width units for one normalized cell value.
///
/// Date cells are sized from `num_format`, the number format they are
/// written with, falling back to the preset date formats.
pub fn estimate_width_len(value: &EnumCellValue, num_format: Option<&str>) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => n.to_string().len(),
        EnumCellValue::Boolean(b) => {
            if *b {
                "TRUE".len()
            } else {
                "FALSE".len()
            }
        }
        EnumCellValue::Date(_) => {
            estimate_num_format_width(num_format.unwrap_or(C_NUM_FORMAT_DATE))
        }
        EnumCellValue::DateTime(_) => {
            estimate_num_format_width(num_format.unwrap_or(C_NUM_FORMAT_DATETIME))
        }
    }
}

// Quotes and escapes in a format code are not rendered.
fn estimate_num_format_width(num_format: &str) -> usize {
    num_format
        .chars()
        .filter(|chr| !matches!(chr, '"' | '\\'))
        .count()
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

/// Clamp an inferred content width with policy bounds and padding.
pub fn calculate_column_width(width_recorded: usize, policy: &SpecAutofitCellsPolicy) -> usize {
    let n_min = usize::max(1, policy.width_cell_min);
    let n_max = usize::min(
        N_WIDTH_EXCEL_COLUMN_MAX,
        usize::max(n_min, policy.width_cell_max),
    );
    usize::min(
        n_max,
        usize::max(n_min, width_recorded + policy.width_cell_padding),
    )
}

/// Validate autofit bounds.
pub fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> XlsxExportResult<()> {
    if policy_autofit.width_cell_min == 0 {
        return Err(XlsxExportError::InvalidExportDefinition(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(XlsxExportError::InvalidExportDefinition(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
///
/// The exporter never calls this itself; callers opt in before exporting.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
