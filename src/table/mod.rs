use std::io::Cursor;

use calamine::{Reader, Xlsx};
use csv::ReaderBuilder;
use tracing::warn;

use crate::pipeline::PipelineError;

/// A single value in a loaded extract. Numeric metrics parse to `Num`;
/// anything the upstream pipeline suppressed or left blank is `Missing`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Str(String),
    Num(f64),
    Missing,
}

impl Cell {
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Cell::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") || trimmed == "NaN" {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Num(v),
            _ => Cell::Str(trimmed.to_string()),
        }
    }
}

/// An immutable column table loaded from one CSV file or one XLSX sheet.
/// The headers are whatever the extract claims; schema drift surfaces as
/// `MissingColumn` on first access, not as a silent index shift.
#[derive(Debug, Clone)]
pub struct DataTable {
    /// Sheet or file name, kept for error context.
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Parse CSV bytes. The first record is the header row.
    pub fn from_csv(name: &str, bytes: &[u8]) -> Result<DataTable, PipelineError> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .from_reader(Cursor::new(bytes));

        let columns: Vec<String> = rdr
            .headers()
            .map_err(|e| PipelineError::Parse {
                source_name: name.to_string(),
                reason: e.to_string(),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| PipelineError::Parse {
                source_name: name.to_string(),
                reason: e.to_string(),
            })?;
            let mut row: Vec<Cell> = record.iter().map(Cell::parse).collect();
            // Short records happen on trailing commas; pad rather than drop the row.
            if row.len() < columns.len() {
                row.resize(columns.len(), Cell::Missing);
            }
            rows.push(row);
        }

        if columns.is_empty() {
            return Err(PipelineError::EmptySheet {
                sheet: name.to_string(),
            });
        }

        Ok(DataTable {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    /// Parse one named sheet out of an XLSX workbook held in memory.
    pub fn from_xlsx_sheet(bytes: &[u8], sheet: &str) -> Result<DataTable, PipelineError> {
        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(bytes)).map_err(|e| PipelineError::Parse {
                source_name: sheet.to_string(),
                reason: e.to_string(),
            })?;

        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| PipelineError::Parse {
                source_name: sheet.to_string(),
                reason: e.to_string(),
            })?;

        let mut iter = range.rows();
        let header = iter.next().ok_or_else(|| PipelineError::EmptySheet {
            sheet: sheet.to_string(),
        })?;
        let columns: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();

        let mut rows = Vec::new();
        for raw in iter {
            let mut row: Vec<Cell> = raw
                .iter()
                .map(|c| match c {
                    calamine::Data::Empty => Cell::Missing,
                    calamine::Data::Float(f) if f.is_finite() => Cell::Num(*f),
                    calamine::Data::Int(i) => Cell::Num(*i as f64),
                    calamine::Data::Bool(b) => Cell::Num(if *b { 1.0 } else { 0.0 }),
                    calamine::Data::Error(e) => {
                        warn!(sheet, error = ?e, "cell error in sheet, treating as missing");
                        Cell::Missing
                    }
                    other => Cell::parse(&other.to_string()),
                })
                .collect();
            if row.len() < columns.len() {
                row.resize(columns.len(), Cell::Missing);
            }
            rows.push(row);
        }

        Ok(DataTable {
            name: sheet.to_string(),
            columns,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, or the schema-drift error for this sheet.
    pub fn column_index(&self, column: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: column.to_string(),
                sheet: self.name.clone(),
            })
    }

    pub fn num(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(Cell::as_num)
    }

    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(Cell::as_str)
    }

    /// New table with the rows that satisfy `pred`, same columns.
    pub fn filter<F>(&self, pred: F) -> DataTable
    where
        F: Fn(&[Cell]) -> bool,
    {
        DataTable {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_with_mixed_cells() {
        let csv = b"country_name_ltn,demographic,value2plot,total_count\n\
                    France,Total sample,0.42,120\n\
                    Austria,Male,,15\n";
        let table = DataTable::from_csv("gpp.csv", csv).unwrap();

        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.len(), 2);
        assert_eq!(table.text(0, 0), Some("France"));
        assert_eq!(table.num(0, 2), Some(0.42));
        assert!(table.rows[1][2].is_missing());
        assert_eq!(table.num(1, 3), Some(15.0));
    }

    #[test]
    fn short_records_are_padded_not_dropped() {
        let csv = b"a,b,c\n1,2\n";
        let table = DataTable::from_csv("short.csv", csv).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.rows[0][2].is_missing());
    }

    #[test]
    fn missing_column_is_an_explicit_error() {
        let csv = b"country,value\nFrance,0.1\n";
        let table = DataTable::from_csv("gpp.csv", csv).unwrap();
        let err = table.column_index("value2plot").unwrap_err();
        match err {
            PipelineError::MissingColumn { column, sheet } => {
                assert_eq!(column, "value2plot");
                assert_eq!(sheet, "gpp.csv");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn na_strings_parse_as_missing() {
        assert_eq!(Cell::parse("NA"), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse(" "), Cell::Missing);
        assert_eq!(Cell::parse("0.5"), Cell::Num(0.5));
        assert_eq!(Cell::parse("Male"), Cell::Str("Male".into()));
    }
}
