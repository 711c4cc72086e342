//! XLSX export kernel that turns typed records into an in-memory workbook.

use std::collections::BTreeSet;
use std::io::Cursor;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::{debug, info, warn};

use crate::conf::{EnumFmtKey, N_NROWS_EXCEL_MAX};
use crate::schema::{ExportRecord, SpecRecordSchema};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecCellFormat, SpecXlsxExportOptions,
    SpecXlsxExportOutput, SpecXlsxExportReport, XlsxExportError, XlsxExportResult,
};
use crate::util::{
    calculate_column_width, convert_cell_value, estimate_width_len, plan_columns,
    validate_policy_autofit,
};

/// Body formats resolved once per export call.
struct SpecBodyFormats {
    fmt_text: Format,
    fmt_date: Format,
    fmt_datetime: Format,
    num_format_date: Option<String>,
    num_format_datetime: Option<String>,
}

impl SpecBodyFormats {
    fn new(export_options: &SpecXlsxExportOptions) -> Self {
        let fmt_spec_date = export_options.resolve_format(EnumFmtKey::Date);
        let fmt_spec_datetime = export_options.resolve_format(EnumFmtKey::DateTime);
        Self {
            fmt_text: derive_rust_xlsx_format(&export_options.resolve_format(EnumFmtKey::Text)),
            fmt_date: derive_rust_xlsx_format(&fmt_spec_date),
            fmt_datetime: derive_rust_xlsx_format(&fmt_spec_datetime),
            num_format_date: fmt_spec_date.num_format,
            num_format_datetime: fmt_spec_datetime.num_format,
        }
    }

    fn select(&self, value: &EnumCellValue) -> &Format {
        match value {
            EnumCellValue::Date(_) => &self.fmt_date,
            EnumCellValue::DateTime(_) => &self.fmt_datetime,
            _ => &self.fmt_text,
        }
    }

    fn num_format(&self, value: &EnumCellValue) -> Option<&str> {
        match value {
            EnumCellValue::Date(_) => self.num_format_date.as_deref(),
            EnumCellValue::DateTime(_) => self.num_format_datetime.as_deref(),
            _ => None,
        }
    }
}

/// Configured exporter; each call returns its own report.
#[derive(Debug, Clone, Default)]
pub struct XlsxExporter {
    export_options: SpecXlsxExportOptions,
}

impl XlsxExporter {
    /// Create exporter with format/options presets.
    pub fn new(export_options: SpecXlsxExportOptions) -> Self {
        Self { export_options }
    }

    /// Active export options.
    pub fn options(&self) -> &SpecXlsxExportOptions {
        &self.export_options
    }

    /// Export records of a type that declares its own schema.
    pub fn export<'a, T, I>(
        &self,
        records: I,
        sheet_name: &str,
        cols_excluded: Option<&BTreeSet<String>>,
    ) -> XlsxExportResult<SpecXlsxExportOutput>
    where
        T: ExportRecord + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        self.export_with_schema(&T::schema(), records, sheet_name, cols_excluded)
    }

    /// Export records using an explicit schema.
    ///
    /// Writes one worksheet named `sheet_name` (verbatim) with a header row
    /// followed by one row per record, then returns the serialized workbook
    /// as a cursor positioned at offset 0 along with the call's report.
    pub fn export_with_schema<'a, T, I>(
        &self,
        schema: &SpecRecordSchema<T>,
        records: I,
        sheet_name: &str,
        cols_excluded: Option<&BTreeSet<String>>,
    ) -> XlsxExportResult<SpecXlsxExportOutput>
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let export_options = &self.export_options;
        validate_policy_autofit(&export_options.policy_autofit)?;

        let l_records: Vec<&T> = records.into_iter().collect();
        let n_rows_data = l_records.len();

        let mut report = SpecXlsxExportReport {
            sheet_name: sheet_name.to_string(),
            ..Default::default()
        };

        let plan = plan_columns(
            schema,
            cols_excluded,
            export_options.header_label,
            &mut report,
        )?;
        debug!(
            sheet = sheet_name,
            columns = ?plan.labels,
            "resolved xlsx column plan"
        );

        if n_rows_data > N_NROWS_EXCEL_MAX - 1 {
            return Err(XlsxExportError::ExportFailure(format!(
                "Excel row limit exceeded: {n_rows_data} records + 1 header row > {N_NROWS_EXCEL_MAX}."
            )));
        }

        let fmt_header =
            derive_rust_xlsx_format(&export_options.resolve_format(EnumFmtKey::Header));
        let fmts_body = SpecBodyFormats::new(export_options);

        let policy_autofit = &export_options.policy_autofit;
        let if_autofit_columns = !matches!(
            policy_autofit.rule_columns,
            EnumAutofitColumnsRule::None
        );
        let n_rows_autofit_max = policy_autofit.height_body_inferred_max.unwrap_or(n_rows_data);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        write_header(worksheet, &plan.labels, &fmt_header)?;
        if export_options.if_freeze_header {
            worksheet.set_freeze_panes(1, 0)?;
        }

        let l_width_by_col_header: Vec<usize> = plan
            .labels
            .iter()
            .map(|label| estimate_width_len(&EnumCellValue::String(label.clone()), None))
            .collect();
        let mut l_width_by_col_body = vec![0usize; plan.width()];
        let mut n_cells_non_finite = 0usize;

        let l_cols = schema.columns();
        for (n_idx_row, record) in l_records.iter().enumerate() {
            for (n_idx_col, n_idx_desc) in plan.cols_idx.iter().enumerate() {
                let value_raw = l_cols[*n_idx_desc].read(record);
                if let EnumCellValue::Number(n) = value_raw
                    && !n.is_finite()
                {
                    n_cells_non_finite += 1;
                }
                let value = convert_cell_value(
                    value_raw,
                    export_options.keep_missing_values,
                    &export_options.value_policy,
                );

                if if_autofit_columns && n_idx_row < n_rows_autofit_max {
                    l_width_by_col_body[n_idx_col] = usize::max(
                        l_width_by_col_body[n_idx_col],
                        estimate_width_len(&value, fmts_body.num_format(&value)),
                    );
                }

                write_cell_with_format(
                    worksheet,
                    n_idx_row + 1,
                    n_idx_col,
                    &value,
                    fmts_body.select(&value),
                )?;
            }
        }

        if n_cells_non_finite > 0 {
            warn!(
                sheet = sheet_name,
                cells = n_cells_non_finite,
                "non-finite numbers written as text"
            );
            report.warn(format!(
                "{n_cells_non_finite} non-finite number(s) written as text."
            ));
        }

        if if_autofit_columns {
            for n_idx_col in 0..plan.width() {
                let n_width_recorded = match policy_autofit.rule_columns {
                    EnumAutofitColumnsRule::Header => l_width_by_col_header[n_idx_col],
                    EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                    EnumAutofitColumnsRule::All | EnumAutofitColumnsRule::None => usize::max(
                        l_width_by_col_header[n_idx_col],
                        l_width_by_col_body[n_idx_col],
                    ),
                };
                let n_width_final = calculate_column_width(n_width_recorded, policy_autofit);
                worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
            }
        }

        let v_buf = workbook.save_to_buffer()?;

        report.columns = plan.labels;
        report.n_rows_data = n_rows_data;
        info!(
            sheet = sheet_name,
            rows = n_rows_data,
            columns = report.columns.len(),
            bytes = v_buf.len(),
            "xlsx export completed"
        );

        Ok(SpecXlsxExportOutput {
            document: Cursor::new(v_buf),
            report,
        })
    }
}

/// Export `records` with default options, using the type's own schema.
pub fn export_records<'a, T, I>(
    records: I,
    sheet_name: &str,
    cols_excluded: Option<&BTreeSet<String>>,
) -> XlsxExportResult<Cursor<Vec<u8>>>
where
    T: ExportRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    XlsxExporter::default()
        .export(records, sheet_name, cols_excluded)
        .map(|output| output.document)
}

/// Export `records` with default options and an explicit schema.
pub fn export_records_with_schema<'a, T, I>(
    schema: &SpecRecordSchema<T>,
    records: I,
    sheet_name: &str,
    cols_excluded: Option<&BTreeSet<String>>,
) -> XlsxExportResult<Cursor<Vec<u8>>>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
{
    XlsxExporter::default()
        .export_with_schema(schema, records, sheet_name, cols_excluded)
        .map(|output| output.document)
}

/// Run [`export_records`] on the tokio blocking pool.
#[cfg(feature = "async")]
pub async fn export_records_async<T>(
    records: Vec<T>,
    sheet_name: String,
    cols_excluded: Option<BTreeSet<String>>,
) -> XlsxExportResult<Cursor<Vec<u8>>>
where
    T: ExportRecord + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        export_records(&records, &sheet_name, cols_excluded.as_ref())
    })
    .await
    .map_err(|err| XlsxExportError::ExportFailure(format!("export task failed: {err}")))?
}

fn write_header(
    worksheet: &mut Worksheet,
    labels: &[String],
    fmt_header: &Format,
) -> XlsxExportResult<()> {
    for (col_idx, label) in labels.iter().enumerate() {
        worksheet.write_string_with_format(0, cast_col_num(col_idx)?, label, fmt_header)?;
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> XlsxExportResult<()> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::Date(val) => {
            worksheet.write_datetime_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::DateTime(val) => {
            worksheet.write_datetime_with_format(n_row, n_col, val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> XlsxExportResult<u32> {
    u32::try_from(value)
        .map_err(|_| XlsxExportError::ExportFailure(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> XlsxExportResult<u16> {
    u16::try_from(value)
        .map_err(|_| XlsxExportError::ExportFailure(format!("column index overflow: {value}")))
}
