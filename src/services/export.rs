//! Spreadsheet export of the inventory

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

use crate::{
    catalog::presentation::{ExportRow, ExportValue, EXPORT_COLUMNS},
    error::AppResult,
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const SHEET_NAME: &str = "Inventory";

/// Download name for an export produced on `date`, e.g. `inventory_2026-01-20.xlsx`
pub fn export_filename(date: NaiveDate) -> String {
    format!("inventory_{}.xlsx", date.format("%Y-%m-%d"))
}

/// A generated spreadsheet ready to be sent or written to disk
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render rows as an in-memory `.xlsx` workbook with a bold header row.
pub fn write_workbook(rows: &[ExportRow]) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in EXPORT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let line = idx as u32 + 1;
        for (col, value) in row.values().enumerate() {
            match value {
                ExportValue::Text(text) => {
                    sheet.write_string(line, col as u16, text.as_str())?;
                }
                ExportValue::Integer(n) => {
                    sheet.write_number(line, col as u16, *n as f64)?;
                }
            }
        }
    }

    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}
