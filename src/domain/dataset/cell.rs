// ============================================================
// CELL VALUES
// ============================================================
// Scalar cell type plus the numeric and textual coercions shared
// by the parser, the profiler and the executor

use serde::{Deserialize, Serialize, Serializer};

/// A single row/column value
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Hashable identity of a present cell, used for distinct-value counting
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Bool(bool),
    Number(u64),
    Text(String),
}

impl Cell {
    /// Classify a raw CSV field: trimmed, one layer of quotes removed,
    /// then null / number / string
    pub fn from_field(raw: &str) -> Self {
        let value = strip_quotes(raw.trim());

        if value.is_empty()
            || value.eq_ignore_ascii_case("null")
            || value.eq_ignore_ascii_case("nan")
        {
            return Cell::Null;
        }

        match parse_number(value) {
            Some(number) => Cell::Number(number),
            None => Cell::Text(value.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Null or empty string
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Textual form used for mapping lookups, string conversion and export
    pub fn to_text(&self) -> String {
        match self {
            Cell::Null => "null".to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Numeric coercion; `None` when the value has no numeric reading
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Null => None,
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Number(n) if n.is_nan() => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_number(s),
        }
    }

    pub fn to_bool(&self) -> bool {
        matches!(self.to_text().to_lowercase().as_str(), "true" | "1" | "yes")
    }

    /// Distinct-value key; `None` for missing cells
    pub fn distinct_key(&self) -> Option<CellKey> {
        if self.is_missing() {
            return None;
        }

        match self {
            Cell::Bool(b) => Some(CellKey::Bool(*b)),
            // 0 and -0 are the same value, and every NaN is the same value
            Cell::Number(n) if *n == 0.0 => Some(CellKey::Number(0f64.to_bits())),
            Cell::Number(n) if n.is_nan() => Some(CellKey::Number(f64::NAN.to_bits())),
            Cell::Number(n) => Some(CellKey::Number(n.to_bits())),
            Cell::Text(s) => Some(CellKey::Text(s.clone())),
            Cell::Null => None,
        }
    }
}

/// Plain JSON scalars. JSON has no infinities, so non-finite numbers are
/// sent as their text form rather than as `null`.
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_unit(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Cell::Number(n) => serializer.serialize_str(&format_number(*n)),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

/// Remove one enclosing pair of double quotes. Quotes that only open or
/// only close belong to the value.
pub fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse a whole-field numeric literal.
///
/// Accepts an optional sign, decimal digits with fraction and exponent,
/// `Infinity`, and unsigned `0x` / `0o` / `0b` integers. Anything else,
/// including partial numbers such as `12abc`, is rejected.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (sign, unsigned) = if let Some(rest) = trimmed.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = trimmed.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, trimmed)
    };

    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    if let Some(value) = parse_radix_literal(trimmed) {
        return Some(value);
    }

    let decimal_chars = unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal_chars || !unsigned.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    trimmed.parse::<f64>().ok()
}

fn parse_radix_literal(text: &str) -> Option<f64> {
    let lower = text.get(..2)?.to_ascii_lowercase();
    let radix = match lower.as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };

    let digits = &text[2..];
    if digits.is_empty() || digits.starts_with('+') {
        return None;
    }

    u64::from_str_radix(digits, radix).ok().map(|v| v as f64)
}

/// Render a number the way a user expects to read it back:
/// integral values without a fraction, infinities spelled out
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let rendered = format!("{:e}", n);
        return match rendered.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => rendered,
        };
    }

    format!("{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_field_classifies_nulls() {
        assert_eq!(Cell::from_field(""), Cell::Null);
        assert_eq!(Cell::from_field("  "), Cell::Null);
        assert_eq!(Cell::from_field("NULL"), Cell::Null);
        assert_eq!(Cell::from_field("NaN"), Cell::Null);
        assert_eq!(Cell::from_field("\"\""), Cell::Null);
    }

    #[test]
    fn test_from_field_numbers_and_strings() {
        assert_eq!(Cell::from_field(" 30 "), Cell::Number(30.0));
        assert_eq!(Cell::from_field("-2.5e2"), Cell::Number(-250.0));
        assert_eq!(Cell::from_field("\"42\""), Cell::Number(42.0));
        assert_eq!(Cell::from_field("12abc"), Cell::text("12abc"));
        assert_eq!(Cell::from_field("true"), Cell::text("true"));
        assert_eq!(Cell::from_field("say \"hi\""), Cell::text("say \"hi\""));
    }

    #[test]
    fn test_parse_number_grammar() {
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("1."), Some(1.0));
        assert_eq!(parse_number("+7"), Some(7.0));
        assert_eq!(parse_number("0x1A"), Some(26.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("1_000"), None);
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("-0x10"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_missing_and_distinct_keys() {
        assert!(Cell::text("").is_missing());
        assert!(!Cell::Number(0.0).is_missing());
        assert_eq!(
            Cell::Number(0.0).distinct_key(),
            Cell::Number(-0.0).distinct_key()
        );
        assert_ne!(
            Cell::Number(1.0).distinct_key(),
            Cell::text("1").distinct_key()
        );
        assert_eq!(Cell::Null.distinct_key(), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert!(Cell::text("YES").to_bool());
        assert!(Cell::Number(1.0).to_bool());
        assert!(Cell::Bool(true).to_bool());
        assert!(!Cell::text("no").to_bool());
        assert!(!Cell::Number(2.0).to_bool());
    }

    #[test]
    fn test_serde_untagged_shape() {
        let cells: Vec<Cell> = serde_json::from_str(r#"[null, true, 3, "x"]"#).unwrap();
        assert_eq!(
            cells,
            vec![Cell::Null, Cell::Bool(true), Cell::Number(3.0), Cell::text("x")]
        );
        assert_eq!(serde_json::to_string(&cells).unwrap(), r#"[null,true,3.0,"x"]"#);
    }

    #[test]
    fn test_non_finite_numbers_serialize_as_text() {
        let cells = vec![
            Cell::from_field("Infinity"),
            Cell::from_field("-Infinity"),
            Cell::Number(1.5),
        ];
        assert_eq!(
            serde_json::to_value(&cells).unwrap(),
            serde_json::json!(["Infinity", "-Infinity", 1.5])
        );
    }
}
