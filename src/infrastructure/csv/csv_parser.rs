// ============================================================
// CSV PARSER
// ============================================================
// Turn raw CSV text into a Dataset. Never fails: malformed input
// degrades to strings and nulls.

use std::borrow::Cow;

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{Encoding, WINDOWS_1252};

use crate::domain::dataset::{strip_quotes, Cell, Dataset, Row};

/// CSV parser with encoding detection
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse uploaded bytes: BOM-aware, UTF-8 first, windows-1252 fallback
    pub fn parse_bytes(&self, bytes: &[u8]) -> Dataset {
        let content = decode_with_encoding_detection(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Dataset {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let records: Vec<StringRecord> = if has_unterminated_quote(content) {
            // A quote left open would swallow the rest of the file into one
            // field, so each line is lexed on its own instead
            tracing::warn!("Unbalanced quotes in CSV content, reading it line by line");
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| self.read_records(line).into_iter().next())
                .collect()
        } else {
            self.read_records(content)
                .into_iter()
                .filter(|record| !is_blank_line(content, record))
                .collect()
        };

        let Some((header, records)) = records.split_first() else {
            return Dataset::empty();
        };
        let raw_header: Vec<String> = header.iter().map(parse_header_name).collect();

        let (columns, sources) = resolve_columns(&raw_header);
        let rows: Vec<Row> = records
            .iter()
            .map(|record| {
                sources
                    .iter()
                    .map(|&idx| record.get(idx).map(Cell::from_field).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();

        tracing::debug!(
            columns = columns.len(),
            rows = rows.len(),
            "Parsed CSV content"
        );

        Dataset::new(columns, rows)
    }

    fn read_records(&self, content: &str) -> Vec<StringRecord> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        reader
            .records()
            .enumerate()
            .filter_map(|(index, result)| match result {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(record = index, error = %e, "Skipping unreadable CSV record");
                    None
                }
            })
            .collect()
    }
}

/// Well-formed CSV always holds an even number of quote characters
fn has_unterminated_quote(content: &str) -> bool {
    content.bytes().filter(|&b| b == b'"').count() % 2 == 1
}

fn parse_header_name(raw: &str) -> String {
    strip_quotes(raw.trim()).to_string()
}

/// A record is blank when the source line it starts on is empty or
/// whitespace-only. A quoted empty field (`""`) is not blank.
fn is_blank_line(content: &str, record: &StringRecord) -> bool {
    if record.len() != 1 || !record[0].trim().is_empty() {
        return false;
    }

    let start = record
        .position()
        .map(|p| p.byte() as usize)
        .unwrap_or(0);

    // The reader silently skips empty lines, so the record starts on the
    // first non-empty line at or after its position
    content
        .get(start..)
        .and_then(|rest| rest.lines().find(|line| !line.is_empty()))
        .map(|line| line.trim().is_empty())
        .unwrap_or(true)
}

/// Unique column names in first-occurrence order, each paired with the
/// source index it reads from. A repeated header name reads from its
/// last position.
fn resolve_columns(raw_header: &[String]) -> (Vec<String>, Vec<usize>) {
    let mut columns: Vec<String> = Vec::new();
    let mut sources: Vec<usize> = Vec::new();

    for (idx, name) in raw_header.iter().enumerate() {
        match columns.iter().position(|c| c == name) {
            Some(existing) => sources[existing] = idx,
            None => {
                columns.push(name.clone());
                sources.push(idx);
            }
        }
    }

    (columns, sources)
}

/// Decode bytes to text, honouring a BOM when present
fn decode_with_encoding_detection(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text;
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::debug!("CSV bytes are not valid UTF-8, decoding as windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Dataset {
        CsvParser::new().parse_content(content)
    }

    #[test]
    fn test_parse_simple_csv() {
        let data = parse("name,age\nAlice,30\nBob,\n");

        assert_eq!(data.columns(), &["name".to_string(), "age".to_string()]);
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.get(0, "name"), Some(&Cell::text("Alice")));
        assert_eq!(data.get(0, "age"), Some(&Cell::Number(30.0)));
        assert_eq!(data.get(1, "age"), Some(&Cell::Null));
    }

    #[test]
    fn test_empty_input_gives_empty_dataset() {
        assert_eq!(parse(""), Dataset::empty());
        assert_eq!(parse("\n  \n\r\n"), Dataset::empty());
    }

    #[test]
    fn test_header_only() {
        let data = parse("a,b\n");
        assert_eq!(data.column_count(), 2);
        assert!(data.is_empty());
    }

    #[test]
    fn test_blank_lines_are_discarded_anywhere() {
        let data = parse("\n\na,b\r\n\r\n1,2\n   \n3,4\n\n");
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.get(1, "a"), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn test_header_is_trimmed_and_unquoted() {
        let data = parse(" \"first name\" , age \nAda,36");
        assert_eq!(data.columns(), &["first name".to_string(), "age".to_string()]);
    }

    #[test]
    fn test_quoted_fields_keep_commas_and_escaped_quotes() {
        let data = parse("name,quote\n\"Smith, J\",\"He said \"\"hi\"\"\"\n");
        assert_eq!(data.get(0, "name"), Some(&Cell::text("Smith, J")));
        assert_eq!(data.get(0, "quote"), Some(&Cell::text("He said \"hi\"")));
    }

    #[test]
    fn test_quoted_field_may_span_lines() {
        let data = parse("id,note\n1,\"line one\nline two\"\n2,plain\n");
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.get(0, "note"), Some(&Cell::text("line one\nline two")));
    }

    #[test]
    fn test_unbalanced_quote_keeps_following_rows() {
        let data = parse("id,desc\n1,\"open\n2,x\n\n3,\"y, z\"\n");
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.get(0, "id"), Some(&Cell::Number(1.0)));
        assert_eq!(data.get(0, "desc"), Some(&Cell::text("open")));
        assert_eq!(data.get(1, "desc"), Some(&Cell::text("x")));
        assert_eq!(data.get(2, "desc"), Some(&Cell::text("y, z")));
    }

    #[test]
    fn test_null_markers_and_numbers() {
        let data = parse("a,b,c,d\nNULL,nan,\"7\",x7\n");
        assert_eq!(data.get(0, "a"), Some(&Cell::Null));
        assert_eq!(data.get(0, "b"), Some(&Cell::Null));
        assert_eq!(data.get(0, "c"), Some(&Cell::Number(7.0)));
        assert_eq!(data.get(0, "d"), Some(&Cell::text("x7")));
    }

    #[test]
    fn test_short_rows_padded_and_long_rows_cut() {
        let data = parse("a,b,c\n1\n1,2,3,4\n");
        assert_eq!(data.rows()[0], vec![Cell::Number(1.0), Cell::Null, Cell::Null]);
        assert_eq!(data.rows()[1].len(), 3);
    }

    #[test]
    fn test_quoted_empty_line_is_a_row() {
        let data = parse("only\n1\n\"\"\n2\n");
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.get(1, "only"), Some(&Cell::Null));
    }

    #[test]
    fn test_duplicate_header_reads_last_position() {
        let data = parse("a,b,a\n1,2,3\n");
        assert_eq!(data.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(data.get(0, "a"), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn test_mixed_types_are_not_unified() {
        let data = parse("v\n1\ntwo\n3\n");
        assert_eq!(data.get(0, "v"), Some(&Cell::Number(1.0)));
        assert_eq!(data.get(1, "v"), Some(&Cell::text("two")));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let content = "a,b\n1,x\n,\"y, z\"\n";
        assert_eq!(parse(content), parse(content));
    }

    #[test]
    fn test_parse_bytes_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"id,name\n1,Ana\n");
        let data = CsvParser::new().parse_bytes(&bytes);
        assert_eq!(data.columns()[0], "id");
    }

    #[test]
    fn test_parse_bytes_falls_back_to_windows_1252() {
        let bytes = b"city\nM\xfcnchen\n";
        let data = CsvParser::new().parse_bytes(bytes);
        assert_eq!(data.get(0, "city"), Some(&Cell::text("München")));
    }
}
