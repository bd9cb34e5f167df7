//! JSON Schema validation for merged values

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Validate merged values against a chart's `values.schema.json`
///
/// The first violation is surfaced with its instance path; the remaining ones
/// are not collected, matching the fail-fast policy of the render pipeline.
pub fn validate(schema_bytes: &[u8], values: &Values) -> Result<()> {
    let schema: serde_json::Value = serde_json::from_slice(schema_bytes).map_err(|e| {
        CoreError::invalid_chart(format!("cannot parse values.schema.json: {}", e))
    })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| {
        CoreError::invalid_chart(format!("invalid values.schema.json: {}", e))
    })?;

    if let Some(error) = validator.iter_errors(values.inner()).next() {
        let path = error.instance_path.to_string();
        let detail = if path.is_empty() {
            error.to_string()
        } else {
            format!("{} (at {})", error, path)
        };
        return Err(CoreError::SchemaValidation { detail });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "replicas": {"type": "integer", "minimum": 1},
            "image": {
                "type": "object",
                "required": ["tag"],
                "properties": {"tag": {"type": "string"}}
            }
        },
        "required": ["image"]
    }"#;

    #[test]
    fn test_valid_values_pass() {
        let values = Values::from_yaml("replicas: 2\nimage: {tag: '1.0'}").unwrap();
        assert!(validate(SCHEMA.as_bytes(), &values).is_ok());
    }

    #[test]
    fn test_violation_reports_instance_path() {
        let values = Values::from_yaml("replicas: 0\nimage: {tag: '1.0'}").unwrap();
        let err = validate(SCHEMA.as_bytes(), &values).unwrap_err();
        let CoreError::SchemaValidation { detail } = err else {
            panic!("expected schema validation error");
        };
        assert!(detail.contains("replicas"), "detail: {}", detail);
    }

    #[test]
    fn test_missing_required_key_fails() {
        let values = Values::from_yaml("replicas: 2").unwrap();
        assert!(validate(SCHEMA.as_bytes(), &values).is_err());
    }

    #[test]
    fn test_garbage_schema_is_invalid_chart() {
        let values = Values::new();
        let err = validate(b"not json", &values).unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }
}
