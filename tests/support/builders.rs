#![allow(dead_code)]
use umya_spreadsheet::{NumberingFormat, Worksheet};
use workbook_search::cellref::column_number;

#[derive(Clone, Debug)]
pub enum CellVal {
    Text(String),
    Num(f64),
    /// Excel serial date shown as `yyyy-mm-dd`.
    Date(f64),
    /// Formula text and the cached result a saved workbook carries with it.
    Formula(String, String),
    Empty,
}

impl From<&str> for CellVal {
    fn from(s: &str) -> Self {
        CellVal::Text(s.to_string())
    }
}

impl From<f64> for CellVal {
    fn from(n: f64) -> Self {
        CellVal::Num(n)
    }
}

impl From<i32> for CellVal {
    fn from(n: i32) -> Self {
        CellVal::Num(n as f64)
    }
}

fn parse_cell_ref(cell_ref: &str) -> (u32, u32) {
    let split = cell_ref
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell_ref.len());
    let (letters, digits) = cell_ref.split_at(split);
    let col = column_number(letters).expect("column letters");
    let row: u32 = digits.parse().unwrap_or(1);
    (col, row)
}

fn set_cell(sheet: &mut Worksheet, col: u32, row: u32, val: &CellVal) {
    match val {
        CellVal::Text(s) => {
            sheet.get_cell_mut((col, row)).set_value(s.clone());
        }
        CellVal::Num(n) => {
            sheet.get_cell_mut((col, row)).set_value_number(*n);
        }
        CellVal::Date(serial) => {
            sheet.get_cell_mut((col, row)).set_value_number(*serial);
            sheet
                .get_style_mut((col, row))
                .get_number_format_mut()
                .set_format_code(NumberingFormat::FORMAT_DATE_YYYYMMDD2);
        }
        CellVal::Formula(formula, cached) => {
            let cell = sheet.get_cell_mut((col, row));
            cell.set_value(cached.clone());
            cell.set_formula(formula.clone());
        }
        CellVal::Empty => {}
    }
}

/// Header row at `start`, data rows below it.
pub fn fill_table<H, R, V>(sheet: &mut Worksheet, start: &str, headers: &[H], rows: &[R])
where
    H: AsRef<str>,
    R: AsRef<[V]>,
    V: Into<CellVal> + Clone,
{
    let (start_col, start_row) = parse_cell_ref(start);

    for (i, header) in headers.iter().enumerate() {
        sheet
            .get_cell_mut((start_col + i as u32, start_row))
            .set_value(header.as_ref().to_string());
    }

    for (row_idx, row_data) in rows.iter().enumerate() {
        let row = start_row + 1 + row_idx as u32;
        for (col_idx, val) in row_data.as_ref().iter().enumerate() {
            let cell_val: CellVal = val.clone().into();
            set_cell(sheet, start_col + col_idx as u32, row, &cell_val);
        }
    }
}

pub fn fill_sparse(sheet: &mut Worksheet, cells: &[(&str, CellVal)]) {
    for (cell_ref, val) in cells {
        let (col, row) = parse_cell_ref(cell_ref);
        set_cell(sheet, col, row, val);
    }
}
