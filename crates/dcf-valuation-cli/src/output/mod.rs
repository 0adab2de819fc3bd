pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use rust_decimal::Decimal;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a serialised decimal rounded to `dp` places. Decimals arrive as
/// strings; anything that does not parse is shown as-is.
pub(crate) fn decimal_cell(value: Option<&Value>, dp: u32) -> String {
    match value {
        Some(Value::String(s)) => match s.parse::<Decimal>() {
            Ok(d) => d.round_dp(dp).to_string(),
            Err(_) => s.clone(),
        },
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

/// True for the `{ result, methodology, warnings, ... }` computation envelope.
pub(crate) fn is_envelope(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|m| m.contains_key("result") && m.contains_key("methodology"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_cell_rounds_strings() {
        assert_eq!(decimal_cell(Some(&json!("1234.56789")), 2), "1234.57");
        assert_eq!(decimal_cell(Some(&json!("Bull")), 2), "Bull");
        assert_eq!(decimal_cell(None, 2), "-");
        assert_eq!(decimal_cell(Some(&json!(5)), 2), "5");
    }

    #[test]
    fn test_envelope_detection() {
        assert!(is_envelope(&json!({"result": {}, "methodology": "x"})));
        assert!(!is_envelope(&json!({"result": {}})));
        assert!(!is_envelope(&json!(null)));
    }
}
