use serde_json::Value;

use super::{decimal_cell, is_envelope};

/// Fields tried in order when a result has no special shape.
const PRIORITY_KEYS: [&str; 4] = ["enterprise_value", "equity_value", "wacc", "cost_of_equity"];

/// Print just the headline numbers.
///
/// Scenario analyses print one `name: enterprise value` line per scenario;
/// peer analyses print each metric median. Anything else falls back to the
/// first priority field present.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{}", line);
    }
}

fn minimal_lines(value: &Value) -> Vec<String> {
    if let Value::Object(map) = value {
        if !is_envelope(value) && map.values().any(is_envelope) {
            return map
                .values()
                .filter(|v| is_envelope(v))
                .flat_map(minimal_lines)
                .collect();
        }
    }

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(Value::Array(results)) = result.get("results") {
        return results
            .iter()
            .map(|r| {
                format!(
                    "{}: {}",
                    r.get("scenario_name").and_then(Value::as_str).unwrap_or("?"),
                    decimal_cell(r.get("enterprise_value"), 2)
                )
            })
            .collect();
    }

    if let Some(Value::Object(summary)) = result.get("summary") {
        return summary
            .iter()
            .filter_map(|(metric, stats)| {
                stats
                    .get("median")
                    .map(|m| format!("{}: {}", metric, decimal_cell(Some(m), 4)))
            })
            .collect();
    }

    if let Value::Object(map) = result {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return vec![decimal_cell(Some(val), 6)];
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return vec![format!("{}: {}", key, decimal_cell(Some(val), 6))];
        }
    }

    vec![decimal_cell(Some(result), 6)]
}
