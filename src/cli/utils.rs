use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format.
///
/// In JSON mode the fields of `data` (when it is an object) are merged into
/// the top-level response; any other value is placed under `data`.
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&success_body(message, data))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Print `key: value` lines for the scalar fields of an object
pub fn output_fields(value: &Value) {
    if let Some(object) = value.as_object() {
        for (key, field) in object {
            match field {
                Value::String(s) => println!("  {}: {}", key, s),
                Value::Object(_) | Value::Array(_) => {}
                other => println!("  {}: {}", key, other),
            }
        }
    }
}

fn success_body(message: &str, data: Option<Value>) -> Value {
    let mut response = json!({
        "success": true,
        "message": message
    });

    match data {
        Some(Value::Object(fields)) => {
            if let Some(object) = response.as_object_mut() {
                object.extend(fields);
            }
        }
        Some(other) => response["data"] = other,
        None => {}
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_data_is_merged() {
        let body = success_body("done", Some(json!({"duplicated": 3})));
        assert_eq!(body["duplicated"], 3);
        assert_eq!(body["success"], true);
    }

    #[test]
    fn scalar_data_is_nested() {
        let body = success_body("done", Some(json!([1, 2])));
        assert_eq!(body["data"], json!([1, 2]));
        assert!(success_body("done", None).get("data").is_none());
    }
}
