//! Compose-oriented template filters
//!
//! These filters extend MiniJinja with conveniences for authoring
//! docker-compose fragments and companion config files.

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};

/// Convert a value to YAML format
///
/// Usage: {{ values.config | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    let yaml = serde_yaml::to_string(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    // Drop document marker and trailing newline from serde_yaml output
    let yaml = yaml.trim_start_matches("---\n").trim_end();

    Ok(yaml.to_string())
}

/// Convert a value to JSON format
///
/// Usage: {{ values.config | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    serde_json::to_string(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Convert a value to pretty-printed JSON
///
/// Usage: {{ values.config | tojson_pretty }}
pub fn tojson_pretty(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    serde_json::to_string_pretty(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Base64 encode a string
///
/// Usage: {{ secret | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Base64 decode a string
///
/// Usage: {{ encoded | b64decode }}
pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("base64 decode error: {}", e)))?;

    String::from_utf8(decoded)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("UTF-8 decode error: {}", e)))
}

/// Quote a string with double quotes
///
/// Usage: {{ name | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let s = if let Some(str_val) = value.as_str() {
        str_val.to_string()
    } else {
        value.to_string()
    };
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote a string with single quotes
///
/// Usage: {{ name | squote }}
#[must_use]
pub fn squote(value: Value) -> String {
    let s = if let Some(str_val) = value.as_str() {
        str_val.to_string()
    } else {
        value.to_string()
    };
    format!("'{}'", s.replace('\'', "''"))
}

/// Indent text with a newline prefix
///
/// Usage: {{ content | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    let mut result = String::with_capacity(1 + value.len() + spaces * value.lines().count());
    result.push('\n');
    result.push_str(&indent(value, spaces));
    result
}

/// Indent text without newline prefix
///
/// Usage: {{ content | indent(4) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let mut result = String::with_capacity(value.len() + spaces * value.lines().count());

    let indent_str = " ".repeat(spaces);
    let mut first = true;

    for line in value.lines() {
        if !first {
            result.push('\n');
        }
        first = false;

        if !line.is_empty() {
            result.push_str(&indent_str);
        }
        result.push_str(line);
    }

    result
}

/// Require a value, fail if undefined or empty
///
/// Usage: {{ values.image.tag | required("image tag is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        let msg = message.unwrap_or_else(|| "required value is missing".to_string());
        Err(Error::new(ErrorKind::InvalidOperation, msg))
    } else if let Some(s) = value.as_str() {
        if s.is_empty() {
            let msg = message.unwrap_or_else(|| "required value is empty".to_string());
            Err(Error::new(ErrorKind::InvalidOperation, msg))
        } else {
            Ok(value)
        }
    } else {
        Ok(value)
    }
}

/// Check if a value is empty
///
/// Usage: {% if values.extra_hosts | empty %}
pub fn empty(value: Value) -> bool {
    if value.is_undefined() || value.is_none() {
        return true;
    }

    match value.len() {
        Some(len) => len == 0,
        None => value.as_str().map(str::is_empty).unwrap_or(false),
    }
}

/// SHA256 hash of a string, useful for change-triggered service labels
///
/// Usage: {{ files.get_string("config/app.conf") | sha256 }}
pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Trim prefix from a string
///
/// Usage: {{ version | trimprefix("v") }}
pub fn trimprefix(value: String, prefix: String) -> String {
    value.strip_prefix(&prefix).unwrap_or(&value).to_string()
}

/// Trim suffix from a string
///
/// Usage: {{ name | trimsuffix(".yaml") }}
pub fn trimsuffix(value: String, suffix: String) -> String {
    value.strip_suffix(&suffix).unwrap_or(&value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toyaml() {
        let value = Value::from_serialize(&serde_json::json!({
            "image": "nginx",
            "port": 8080
        }));
        let yaml = toyaml(value).unwrap();
        assert!(yaml.contains("image: nginx"));
        assert!(yaml.contains("port: 8080"));
    }

    #[test]
    fn test_b64encode_decode() {
        let original = "hello world".to_string();
        let encoded = b64encode(original.clone());
        let decoded = b64decode(encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(Value::from("test")), "\"test\"");
        assert_eq!(squote(Value::from("test")), "'test'");
    }

    #[test]
    fn test_nindent() {
        let input = "line1\nline2".to_string();
        let result = nindent(input, 4);
        assert_eq!(result, "\n    line1\n    line2");
    }

    #[test]
    fn test_required() {
        assert!(required(Value::from("test"), None).is_ok());
        assert!(required(Value::UNDEFINED, None).is_err());
        assert!(required(Value::from(""), None).is_err());
    }

    #[test]
    fn test_empty() {
        assert!(empty(Value::UNDEFINED));
        assert!(empty(Value::from("")));
        assert!(empty(Value::from_serialize(Vec::<i32>::new())));
        assert!(!empty(Value::from("test")));
    }

    #[test]
    fn test_trim_filters() {
        assert_eq!(trimprefix("v1.2.3".to_string(), "v".to_string()), "1.2.3");
        assert_eq!(trimsuffix("app.yaml".to_string(), ".yaml".to_string()), "app");
        assert_eq!(trimprefix("plain".to_string(), "v".to_string()), "plain");
    }
}
