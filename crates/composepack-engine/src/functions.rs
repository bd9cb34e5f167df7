//! Template functions (global functions available in templates)

use minijinja::value::Rest;
use minijinja::{Error, ErrorKind, Value};

/// Fail with a custom error message
///
/// Usage: {{ fail("unsupported database engine") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Create a dict from key-value pairs
///
/// Usage: {{ dict("key1", value1, "key2", value2) }}
pub fn dict(args: Rest<Value>) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "dict requires an even number of arguments (key-value pairs)",
        ));
    }

    let mut map = serde_json::Map::new();

    for chunk in args.chunks(2) {
        let key = chunk[0]
            .as_str()
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "dict keys must be strings"))?;
        let value: serde_json::Value = serde_json::to_value(&chunk[1])
            .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
        map.insert(key.to_string(), value);
    }

    Ok(Value::from_serialize(serde_json::Value::Object(map)))
}

/// Return first non-empty value
///
/// Usage: {{ coalesce(values.tag, chart.version, "latest") }}
pub fn coalesce(args: Rest<Value>) -> Value {
    for arg in args.0 {
        if !arg.is_undefined() && !arg.is_none() {
            if let Some(s) = arg.as_str() {
                if !s.is_empty() {
                    return arg;
                }
            } else {
                return arg;
            }
        }
    }
    Value::UNDEFINED
}

/// Ternary operator
///
/// Usage: {{ ternary("debug", "info", values.debug) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() { true_val } else { false_val }
}

/// Get current timestamp
///
/// Usage: {{ now() }}
pub fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Printf-style formatting
///
/// Usage: {{ printf("%s-%d", name, count) }}
///
/// Supports format specifiers: %s, %d, %f, %v, %%
pub fn printf(format: String, args: Rest<Value>) -> Result<String, Error> {
    let mut result = String::with_capacity(format.len() + args.len() * 10);
    let mut chars = format.chars().peekable();
    let mut arg_idx = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }

        let format_char = match chars.next() {
            Some(fc) => fc,
            None => {
                // Trailing % at end of string
                result.push('%');
                break;
            }
        };

        if format_char == '%' {
            result.push('%');
            continue;
        }

        if arg_idx >= args.len() {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "not enough arguments for format string",
            ));
        }

        let arg = &args[arg_idx];
        match format_char {
            's' | 'v' => result.push_str(&arg.to_string()),
            'd' => {
                if let Some(n) = arg.as_i64() {
                    result.push_str(&n.to_string());
                } else {
                    result.push_str(&arg.to_string());
                }
            }
            'f' => {
                if let Some(n) = arg.as_i64() {
                    result.push_str(&(n as f64).to_string());
                } else {
                    result.push_str(&arg.to_string());
                }
            }
            _ => {
                // Unknown format specifier, treat as %v
                result.push_str(&arg.to_string());
            }
        }
        arg_idx += 1;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict() {
        let result = dict(Rest(vec![
            Value::from("key1"),
            Value::from("value1"),
            Value::from("key2"),
            Value::from(42),
        ]))
        .unwrap();

        assert_eq!(result.get_attr("key1").unwrap().as_str(), Some("value1"));
    }

    #[test]
    fn test_dict_odd_args() {
        assert!(dict(Rest(vec![Value::from("only-key")])).is_err());
    }

    #[test]
    fn test_coalesce() {
        let result = coalesce(Rest(vec![Value::UNDEFINED, Value::from(""), Value::from("x")]));
        assert_eq!(result.as_str(), Some("x"));
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            ternary(Value::from("yes"), Value::from("no"), Value::from(true)).as_str(),
            Some("yes")
        );
        assert_eq!(
            ternary(Value::from("yes"), Value::from("no"), Value::from(false)).as_str(),
            Some("no")
        );
    }

    #[test]
    fn test_printf() {
        let result = printf(
            "Hello %s, you have %d messages".to_string(),
            Rest(vec![Value::from("Alice"), Value::from(5)]),
        )
        .unwrap();
        assert_eq!(result, "Hello Alice, you have 5 messages");
    }

    #[test]
    fn test_printf_missing_args() {
        assert!(printf("%s %s".to_string(), Rest(vec![Value::from("one")])).is_err());
    }
}
