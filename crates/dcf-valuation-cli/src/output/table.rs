use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{decimal_cell, is_envelope};

const PEER_METRICS: [(&str, &str); 4] = [
    ("ev_to_ebitda", "EV/EBITDA"),
    ("price_to_earnings", "P/E"),
    ("price_to_sales", "P/S"),
    ("return_on_equity", "ROE"),
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        v if is_envelope(v) => print_envelope(v),
        Value::Object(map) if map.values().any(is_envelope) => {
            // Multi-section report: one envelope per key
            for (section, env) in map {
                if is_envelope(env) {
                    println!("\n== {} ==\n", section);
                    print_envelope(env);
                }
            }
        }
        Value::Object(_) => print_flat_object(value),
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_envelope(envelope: &Value) {
    let result = &envelope["result"];

    if let Some(Value::Array(results)) = result.get("results") {
        print_scenario_tables(results);
    } else if let Some(Value::Object(summary)) = result.get("summary") {
        print_peer_tables(summary, result.get("implied_values"));
    } else {
        print_flat_object(result);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_scenario_tables(results: &[Value]) {
    let mut summary = Builder::default();
    summary.push_record([
        "Scenario",
        "Enterprise value",
        "PV of FCF",
        "PV of TV",
        "Terminal value",
        "TV share",
        "Equity value",
        "Per share",
        "Discount rate",
        "Terminal g",
    ]);
    for r in results {
        summary.push_record([
            text(r.get("scenario_name")),
            decimal_cell(r.get("enterprise_value"), 2),
            decimal_cell(r.get("present_value_of_cash_flows"), 2),
            decimal_cell(r.get("discounted_terminal_value"), 2),
            decimal_cell(r.get("terminal_value"), 2),
            decimal_cell(r.get("terminal_value_share"), 4),
            decimal_cell(r.get("equity_value"), 2),
            decimal_cell(r.get("implied_price_per_share"), 2),
            decimal_cell(r.get("discount_rate_used"), 4),
            decimal_cell(r.get("terminal_growth_rate_used"), 4),
        ]);
    }
    println!("{}", Table::from(summary));

    for r in results {
        let rows = r.get("projection").and_then(Value::as_array);
        let discounts = r.get("discount_schedule").and_then(Value::as_array);
        let Some(rows) = rows else { continue };

        let mut projection = Builder::default();
        projection.push_record([
            "Year", "Revenue", "EBITDA", "D&A", "EBIT", "NOPAT", "CapEx", "Delta WC", "FCF",
            "Discount", "PV",
        ]);
        for (i, row) in rows.iter().enumerate() {
            let d = discounts.and_then(|ds| ds.get(i));
            projection.push_record([
                text(row.get("year")),
                decimal_cell(row.get("revenue"), 2),
                decimal_cell(row.get("ebitda"), 2),
                decimal_cell(row.get("depreciation"), 2),
                decimal_cell(row.get("ebit"), 2),
                decimal_cell(row.get("nopat"), 2),
                decimal_cell(row.get("capex"), 2),
                decimal_cell(row.get("change_in_working_capital"), 2),
                decimal_cell(row.get("free_cash_flow"), 2),
                decimal_cell(d.and_then(|d| d.get("discount_factor")), 6),
                decimal_cell(d.and_then(|d| d.get("present_value")), 2),
            ]);
        }
        println!("\n{}", text(r.get("scenario_name")));
        println!("{}", Table::from(projection));
    }
}

fn print_peer_tables(summary: &Map<String, Value>, implied: Option<&Value>) {
    let mut stats = Builder::default();
    stats.push_record([
        "Metric", "Mean", "Median", "Low", "High", "Std dev", "Count", "Excluded",
    ]);
    for (key, label) in PEER_METRICS {
        let Some(m) = summary.get(key).filter(|v| v.is_object()) else {
            stats.push_record([label, "-", "-", "-", "-", "-", "0", "all"]);
            continue;
        };
        stats.push_record([
            label.to_string(),
            decimal_cell(m.get("mean"), 2),
            decimal_cell(m.get("median"), 2),
            decimal_cell(m.get("low"), 2),
            decimal_cell(m.get("high"), 2),
            decimal_cell(m.get("std_dev"), 2),
            text(m.get("count")),
            text(m.get("excluded")),
        ]);
    }
    println!("{}", Table::from(stats));

    if let Some(Value::Array(no_data)) = summary.get("peers_without_usable_data") {
        if !no_data.is_empty() {
            let tickers: Vec<&str> = no_data.iter().filter_map(Value::as_str).collect();
            println!("\nNo usable data: {}", tickers.join(", "));
        }
    }

    let Some(Value::Array(implied)) = implied else {
        return;
    };
    if implied.is_empty() {
        return;
    }

    let mut values = Builder::default();
    values.push_record(["Multiple", "Basis", "Target metric", "Low", "Median", "Mean", "High"]);
    for v in implied {
        values.push_record([
            metric_label(v.get("metric")),
            text(v.get("basis")),
            decimal_cell(v.get("target_metric_value"), 2),
            decimal_cell(v.get("implied_at_low"), 2),
            decimal_cell(v.get("implied_at_median"), 2),
            decimal_cell(v.get("implied_at_mean"), 2),
            decimal_cell(v.get("implied_at_high"), 2),
        ]);
    }
    println!("\n{}", Table::from(values));
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &text(Some(val))]);
        }
        println!("{}", Table::from(builder));
    } else {
        println!("{}", value);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers.iter().map(|h| text(map.get(h))).collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", text(Some(item)));
        }
    }
}

fn metric_label(value: Option<&Value>) -> String {
    let raw = text(value);
    let label = match raw.as_str() {
        "EvToEbitda" => "EV/EBITDA",
        "PriceToEarnings" => "P/E",
        "PriceToSales" => "P/S",
        "ReturnOnEquity" => "ROE",
        other => other,
    };
    label.to_string()
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null) | None => "-".to_string(),
        Some(Value::Array(arr)) => {
            let items: Vec<String> = arr.iter().map(|v| text(Some(v))).collect();
            items.join(", ")
        }
        Some(v @ Value::Object(_)) => serde_json::to_string(v).unwrap_or_default(),
    }
}
