use serde_json::Value;

/// Print just the key answer value from the output.
///
/// A portfolio result prints its risk; a frontier prints one
/// `risk,expected_return` line per sample.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = ["risk", "expected_return"];

    match result_obj {
        Value::Object(map) => {
            if let Some(Value::Object(selected)) = map.get("selected") {
                print_priority(selected, &priority_keys);
                return;
            }
            print_priority(map, &priority_keys);
        }
        Value::Array(points) => {
            for point in points {
                let risk = point.get("risk").map(format_minimal).unwrap_or_default();
                let ret = point
                    .get("expected_return")
                    .map(format_minimal)
                    .unwrap_or_default();
                println!("{},{}", risk, ret);
            }
        }
        other => println!("{}", format_minimal(other)),
    }
}

fn print_priority(map: &serde_json::Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if let Some(val) = map.get(*key) {
            if !val.is_null() {
                println!("{}", format_minimal(val));
                return;
            }
        }
    }

    if let Some((key, val)) = map.iter().next() {
        println!("{}: {}", key, format_minimal(val));
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
