// ============================================================
// CSV WRITER
// ============================================================
// Export a Dataset as CSV text. Fields holding the delimiter, a
// quote or a line break are quoted with embedded quotes doubled.
// Reading the export back goes through the usual field cleanup:
// values are trimmed, one enclosing pair of literal quotes is
// removed and numeric-looking text becomes a number.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::domain::dataset::{Cell, Dataset};
use crate::domain::error::{AppError, Result};

pub struct CsvWriter {
    delimiter: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header line then one line per row, joined by `\n`, no trailing newline
    pub fn write_dataset(&self, data: &Dataset) -> Result<String> {
        if data.column_count() == 0 {
            return Ok(String::new());
        }

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(data.columns())?;
        for row in data.rows() {
            writer.write_record(row.iter().map(export_field))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV writer: {}", e)))?;
        let mut text = String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("CSV output is not UTF-8: {}", e)))?;

        if text.ends_with('\n') {
            text.pop();
        }

        Ok(text)
    }
}

fn export_field(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        other => other.to_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::csv::CsvParser;

    #[test]
    fn test_write_simple_dataset() {
        let data = Dataset::new(
            vec!["name".to_string(), "age".to_string(), "active".to_string()],
            vec![
                vec![Cell::text("Alice"), Cell::Number(30.0), Cell::Bool(true)],
                vec![Cell::text("Bob"), Cell::Null, Cell::Bool(false)],
            ],
        );

        let csv = CsvWriter::new().write_dataset(&data).unwrap();
        assert_eq!(csv, "name,age,active\nAlice,30,true\nBob,,false");
    }

    #[test]
    fn test_quotes_fields_that_need_it() {
        let data = Dataset::new(
            vec!["note".to_string()],
            vec![
                vec![Cell::text("a, b")],
                vec![Cell::text("say \"hi\"")],
                vec![Cell::text("two\nlines")],
            ],
        );

        let csv = CsvWriter::new().write_dataset(&data).unwrap();
        assert_eq!(
            csv,
            "note\n\"a, b\"\n\"say \"\"hi\"\"\"\n\"two\nlines\""
        );
    }

    #[test]
    fn test_empty_dataset_exports_nothing() {
        assert_eq!(CsvWriter::new().write_dataset(&Dataset::empty()).unwrap(), "");
    }

    #[test]
    fn test_export_then_parse_keeps_values() {
        let loaded = CsvParser::new()
            .parse_content("city,pop\n\"Portland, OR\",652503\n\"He said \"\"no\"\"\",\n");
        let exported = CsvWriter::new().write_dataset(&loaded).unwrap();
        let reparsed = CsvParser::new().parse_content(&exported);

        assert_eq!(reparsed, loaded);
    }

    #[test]
    fn test_text_wrapped_in_quotes_loses_one_pair_on_reload() {
        let data = Dataset::new(vec!["v".to_string()], vec![vec![Cell::text("\"x\"")]]);

        let exported = CsvWriter::new().write_dataset(&data).unwrap();
        assert_eq!(exported, "v\n\"\"\"x\"\"\"");

        let reparsed = CsvParser::new().parse_content(&exported);
        assert_eq!(reparsed.get(0, "v"), Some(&Cell::text("x")));
    }
}
