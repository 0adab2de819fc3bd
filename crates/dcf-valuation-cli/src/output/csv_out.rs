use serde_json::{Map, Value};
use std::io::{self, Write};

use super::is_envelope;

const PROJECTION_FIELDS: [&str; 9] = [
    "revenue",
    "ebitda",
    "depreciation",
    "ebit",
    "nopat",
    "capex",
    "change_in_working_capital",
    "free_cash_flow",
    "year",
];

const PEER_METRICS: [&str; 4] = [
    "ev_to_ebitda",
    "price_to_earnings",
    "price_to_sales",
    "return_on_equity",
];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match value {
        v if is_envelope(v) => write_result(&mut wtr, &v["result"]),
        Value::Object(map) if map.values().any(is_envelope) => {
            // Report: the DCF section is the tabular one
            match map.values().find(|v| is_envelope(v)) {
                Some(env) => write_result(&mut wtr, &env["result"]),
                None => Ok(()),
            }
        }
        other => write_result(&mut wtr, other),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV output error: {}", e);
    }
}

fn write_result<W: Write>(wtr: &mut csv::Writer<W>, result: &Value) -> csv::Result<()> {
    match result {
        Value::Object(map) => {
            if let Some(Value::Array(results)) = map.get("results") {
                write_scenario_rows(wtr, results)
            } else if let Some(Value::Object(summary)) = map.get("summary") {
                write_peer_rows(wtr, summary)
            } else {
                write_field_rows(wtr, map)
            }
        }
        Value::Array(arr) => write_array(wtr, arr),
        other => wtr.write_record([cell(other)]),
    }
}

/// One row per scenario and projection year.
fn write_scenario_rows<W: Write>(wtr: &mut csv::Writer<W>, results: &[Value]) -> csv::Result<()> {
    let mut header = vec!["scenario", "year"];
    header.extend(PROJECTION_FIELDS.iter().filter(|f| **f != "year"));
    header.extend(["discount_factor", "present_value"]);
    wtr.write_record(&header)?;

    for r in results {
        let name = r.get("scenario_name").map(cell).unwrap_or_default();
        let rows = r.get("projection").and_then(Value::as_array);
        let discounts = r.get("discount_schedule").and_then(Value::as_array);
        for (i, row) in rows.into_iter().flatten().enumerate() {
            let d = discounts.and_then(|ds| ds.get(i));
            let mut record = vec![name.clone(), field(row, "year")];
            for f in PROJECTION_FIELDS.iter().filter(|f| **f != "year") {
                record.push(field(row, f));
            }
            record.push(d.map(|d| field(d, "discount_factor")).unwrap_or_default());
            record.push(d.map(|d| field(d, "present_value")).unwrap_or_default());
            wtr.write_record(&record)?;
        }
    }
    Ok(())
}

/// One row per peer metric; absent metrics get empty cells.
fn write_peer_rows<W: Write>(
    wtr: &mut csv::Writer<W>,
    summary: &Map<String, Value>,
) -> csv::Result<()> {
    let columns = ["mean", "median", "low", "high", "std_dev", "count", "excluded"];
    let mut header = vec!["metric"];
    header.extend(columns);
    wtr.write_record(&header)?;

    for metric in PEER_METRICS {
        let stats = summary.get(metric);
        let mut record = vec![metric.to_string()];
        for c in columns {
            record.push(stats.map(|s| field(s, c)).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    Ok(())
}

fn write_field_rows<W: Write>(
    wtr: &mut csv::Writer<W>,
    map: &Map<String, Value>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &cell(val)])?;
    }
    Ok(())
}

fn write_array<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([cell(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for item in arr {
        let row: Vec<String> = headers.iter().map(|h| field(item, h)).collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(cell).unwrap_or_default()
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(";"),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
