use serde_json::Value;

/// Placeholder shown for missing or null values
pub const MISSING_VALUE: &str = "—";

/// Turn an API field name into a display label.
/// Handles camelCase, snake_case and kebab-case: "totalUsers" -> "Total Users"
pub fn humanize_key(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in key.chars() {
        if matches!(c, '_' | '-' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group an integer with thousands separators: 1234567 -> "1,234,567"
pub fn format_count(n: i128) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Render any JSON value as a single table cell.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING_VALUE.to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                format_count(i as i128)
            } else if let Some(u) = n.as_u64() {
                format_count(u as i128)
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format_count(f as i128)
                } else {
                    format!("{:.2}", f)
                }
            }
        }
        Value::String(s) if s.is_empty() => MISSING_VALUE.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.len() == 1 => "1 item".to_string(),
        Value::Array(items) => format!("{} items", items.len()),
        Value::Object(_) => "{…}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("totalUsers"), "Total Users");
        assert_eq!(humanize_key("total_orders"), "Total Orders");
        assert_eq!(humanize_key("active-teachers"), "Active Teachers");
        assert_eq!(humanize_key("students"), "Students");
        assert_eq!(humanize_key("newUsers30d"), "New Users30d");
        assert_eq!(humanize_key("URL"), "URL");
        assert_eq!(humanize_key(""), "");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(42), "42");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(-9876), "-9,876");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(null)), MISSING_VALUE);
        assert_eq!(format_value(&json!(true)), "Yes");
        assert_eq!(format_value(&json!(12345)), "12,345");
        assert_eq!(format_value(&json!(3.0)), "3");
        assert_eq!(format_value(&json!(12.75)), "12.75");
        assert_eq!(format_value(&json!("")), MISSING_VALUE);
        assert_eq!(format_value(&json!("ok")), "ok");
        assert_eq!(format_value(&json!([1])), "1 item");
        assert_eq!(format_value(&json!([1, 2, 3])), "3 items");
        assert_eq!(format_value(&json!({"a": 1})), "{…}");
    }
}
