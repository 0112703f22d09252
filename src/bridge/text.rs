// In: src/bridge/text.rs

//! The plain-text grid form: one line per row, integers separated by
//! whitespace. A blank line is a row of length zero.

use std::io::{BufRead, Write};

use crate::error::CodecError;
use crate::types::{RowLayout, SampleGrid};

/// Reads one row per line. Line numbers in errors are 1-based.
pub fn parse_rows<R: BufRead>(reader: R) -> Result<SampleGrid, CodecError> {
    let mut samples = Vec::new();
    let mut lengths = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let before = samples.len();
        for token in line.split_whitespace() {
            let value = token.parse::<i32>().map_err(|e| CodecError::ParseError {
                line: index + 1,
                reason: format!("'{}': {}", token, e),
            })?;
            samples.push(value);
        }
        lengths.push(samples.len() - before);
    }

    SampleGrid::new(samples, RowLayout::from_lengths(lengths))
}

/// Parses an in-memory string; see `parse_rows`.
pub fn parse_str(text: &str) -> Result<SampleGrid, CodecError> {
    parse_rows(text.as_bytes())
}

/// Writes each row as single-space separated integers followed by `\n`.
pub fn write_rows<W: Write>(
    mut writer: W,
    samples: &[i32],
    layout: &RowLayout,
) -> Result<(), CodecError> {
    layout.check_total(samples.len())?;
    for range in layout.row_ranges() {
        let mut first = true;
        for value in &samples[range] {
            if !first {
                writer.write_all(b" ")?;
            }
            write!(writer, "{}", value)?;
            first = false;
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn format_rows(samples: &[i32], layout: &RowLayout) -> Result<String, CodecError> {
    let mut out = Vec::with_capacity(samples.len() * 4 + layout.row_count());
    write_rows(&mut out, samples, layout)?;
    String::from_utf8(out).map_err(|e| CodecError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_with_blank_lines() {
        let grid = parse_str("1 2 3\n\n-4   5\n").unwrap();
        assert_eq!(grid.samples(), &[1, 2, 3, -4, 5]);
        assert_eq!(grid.layout().lengths(), &[3, 0, 2]);
    }

    #[test]
    fn test_parse_accepts_missing_final_newline_and_crlf() {
        let grid = parse_str("7 8\r\n9").unwrap();
        assert_eq!(grid.to_rows(), vec![vec![7, 8], vec![9]]);
    }

    #[test]
    fn test_parse_error_reports_line() {
        match parse_str("1 2\n3 x 4\n") {
            Err(CodecError::ParseError { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("'x'"));
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
        assert!(matches!(
            parse_str("2147483648\n"),
            Err(CodecError::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_format_rows() {
        let layout = RowLayout::from_lengths(vec![3, 0, 2]);
        let text = format_rows(&[1, 2, 3, i32::MIN, 5], &layout).unwrap();
        assert_eq!(text, "1 2 3\n\n-2147483648 5\n");
        assert_eq!(format_rows(&[], &RowLayout::default()).unwrap(), "");
    }

    #[test]
    fn test_text_roundtrip() {
        let text = "10 11 12\n13\n\n14 15\n";
        let grid = parse_str(text).unwrap();
        assert_eq!(format_rows(grid.samples(), grid.layout()).unwrap(), text);
    }
}
