use std::io::Cursor;

use calamine::{Data, Reader, Xls, Xlsx};
use serde_json::{Map, Number, Value};

use super::{IngestError, SheetKind};

/// Decode the first worksheet (or the CSV body) into header-keyed rows
///
/// The first row supplies the keys; cells in later rows are matched to
/// them by position. Empty cells are omitted from their row object and
/// rows with no populated cells are skipped.
pub fn decode_rows(kind: SheetKind, bytes: &[u8]) -> Result<Vec<Map<String, Value>>, IngestError> {
    match kind {
        SheetKind::Xlsx => {
            let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(decode_err)?;
            worksheet_rows(&mut workbook)
        }
        SheetKind::Xls => {
            let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes)).map_err(decode_err)?;
            worksheet_rows(&mut workbook)
        }
        SheetKind::Csv => csv_rows(bytes),
    }
}

fn decode_err(e: impl std::fmt::Debug) -> IngestError {
    IngestError::Decode {
        detail: format!("{e:?}"),
    }
}

fn worksheet_rows<'a, R>(workbook: &mut R) -> Result<Vec<Map<String, Value>>, IngestError>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: std::fmt::Debug,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Decode {
            detail: "workbook has no sheets".to_string(),
        })?
        .map_err(decode_err)?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers = header_names(header_row.iter().map(|cell| cell.to_string()));

    let mut out = Vec::new();
    for row in rows {
        let mut object = Map::new();
        for (header, cell) in headers.iter().zip(row) {
            if let Some(value) = cell_value(cell) {
                object.insert(header.clone(), value);
            }
        }
        if !object.is_empty() {
            out.push(object);
        }
    }
    Ok(out)
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<Map<String, Value>>, IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = header_names(
        reader
            .headers()
            .map_err(decode_err)?
            .iter()
            .map(|h| h.to_string()),
    );

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(decode_err)?;
        let mut object = Map::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if let Some(value) = csv_value(field) {
                object.insert(header.clone(), value);
            }
        }
        if !object.is_empty() {
            out.push(object);
        }
    }
    Ok(out)
}

/// Trimmed header names, with blanks replaced by positional fallbacks
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    raw.enumerate()
        .map(|(i, name)| {
            let name = name.trim().to_string();
            if name.is_empty() {
                format!("column_{}", i + 1)
            } else {
                name
            }
        })
        .collect()
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(Value::Number((*i).into())),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number),
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(Value::String(s.to_string()))
            }
        }
        Data::Bool(b) => Some(Value::Bool(*b)),
        // Dates, durations and cell errors keep their display form
        other => Some(Value::String(other.to_string())),
    }
}

/// CSV cells arrive untyped; infer numbers the way workbook cells carry them
fn csv_value(field: &str) -> Option<Value> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    if let Ok(i) = field.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    if let Ok(f) = field.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Some(Value::Number(n));
        }
    }
    Some(Value::String(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_rows_keyed_by_header() {
        let bytes = b"name,present,total\nWeek 1,1,2\nWeek 2,2,2\n";
        let rows = decode_rows(SheetKind::Csv, bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("Week 1"));
        assert_eq!(rows[0]["present"], json!(1));
        assert_eq!(rows[1]["total"], json!(2));
    }

    #[test]
    fn test_csv_empty_cells_are_omitted() {
        let bytes = b"name,present,total\nWeek 1,,2\n";
        let rows = decode_rows(SheetKind::Csv, bytes).unwrap();
        assert!(rows[0].get("present").is_none());
        assert_eq!(rows[0]["total"], json!(2));
    }

    #[test]
    fn test_csv_blank_rows_are_skipped() {
        let bytes = b"name,present\nWeek 1,1\n,\nWeek 2,2\n";
        let rows = decode_rows(SheetKind::Csv, bytes).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_csv_header_only_yields_no_rows() {
        let bytes = b"name,present,total\n";
        let rows = decode_rows(SheetKind::Csv, bytes).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_csv_number_inference() {
        let bytes = b"a,b,c\n1,2.5,text\n";
        let rows = decode_rows(SheetKind::Csv, bytes).unwrap();
        assert_eq!(rows[0]["a"], json!(1));
        assert_eq!(rows[0]["b"], json!(2.5));
        assert_eq!(rows[0]["c"], json!("text"));
    }

    #[test]
    fn test_blank_headers_get_positional_names() {
        let bytes = b"name,,total\nWeek 1,x,2\n";
        let rows = decode_rows(SheetKind::Csv, bytes).unwrap();
        assert_eq!(rows[0]["column_2"], json!("x"));
    }

    #[test]
    fn test_garbage_xlsx_is_a_decode_error() {
        let err = decode_rows(SheetKind::Xlsx, b"definitely not a zip").unwrap_err();
        assert!(matches!(err, IngestError::Decode { .. }));
    }
}
