//! CSV text codec for the persisted dataset.
//!
//! Rows are opaque string arrays: no header or schema check happens here.
//! Output uses standard CSV quoting with CRLF line endings. A blank line is an
//! empty row in both directions, so blank lines already in the object survive
//! a read-modify-write cycle and still count as records.

use std::io::Write;

use super::Row;

/// Parse CSV text into rows. Row lengths may differ; a blank line yields an
/// empty row.
pub fn decode_rows(text: &str) -> Result<Vec<Row>, csv::Error> {
    let mut rows = Vec::new();
    for span in record_spans(text) {
        if span.is_empty() {
            rows.push(Row::new());
            continue;
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(span.as_bytes());
        for rec in rdr.records() {
            let rec = rec?;
            rows.push(rec.iter().map(|f| f.to_string()).collect());
        }
    }
    Ok(rows)
}

/// Split text into the raw text of each record. `\r\n`, `\n` and `\r` end a
/// record unless they sit inside a quoted field. The final terminator is
/// optional.
fn record_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut field_start = true;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if b == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 1;
                } else {
                    in_quotes = false;
                }
            }
            field_start = false;
        } else {
            match b {
                b'"' if field_start => {
                    in_quotes = true;
                    field_start = false;
                }
                b',' => field_start = true,
                b'\r' | b'\n' => {
                    spans.push(&text[start..i]);
                    if b == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    start = i + 1;
                    field_start = true;
                }
                _ => field_start = false,
            }
        }
        i += 1;
    }
    if start < bytes.len() {
        spans.push(&text[start..]);
    }
    spans
}

/// Serialize rows to UTF-8 CSV bytes. An empty row is written as a bare line
/// terminator.
pub fn encode_rows(rows: &[Row]) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    for row in rows {
        if row.is_empty() {
            wtr.flush()?;
            wtr.get_mut().write_all(b"\r\n")?;
        } else {
            wtr.write_record(row)?;
        }
    }
    wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}
