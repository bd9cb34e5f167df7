//! MiniJinja integration for a chart's static files
//!
//! Templates can read the chart's `files/` tree through the `files`
//! global:
//!
//! ```jinja2
//! {# Read a file as string #}
//! {{ files.get_string("nginx/default.conf") }}
//!
//! {# Embed binary content #}
//! {{ files.get("certs/ca.pem") | b64encode }}
//!
//! {# Check if file exists #}
//! {% if files.exists("overrides.env") %}
//! env_file: overrides.env
//! {% endif %}
//!
//! {# Enumerate all file paths #}
//! {% for path in files.paths() %}
//!   - {{ path }}
//! {% endfor %}
//! ```

use std::sync::Arc;

use composepack_core::StaticFiles;
use minijinja::value::{Object, ObjectRepr, Value};
use minijinja::{Error, ErrorKind};

/// MiniJinja Object wrapper over the chart's static files
#[derive(Debug)]
pub struct FilesObject {
    files: StaticFiles,
}

impl FilesObject {
    pub fn new(files: StaticFiles) -> Self {
        Self { files }
    }
}

impl Object for FilesObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &minijinja::State,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "get" => {
                let path = path_arg(args, "get")?;
                match self.files.get(&path) {
                    Some(bytes) => Ok(Value::from(bytes.to_vec())),
                    None => Err(Error::new(
                        ErrorKind::InvalidOperation,
                        format!("file '{}' not found in chart files", path),
                    )),
                }
            }

            "get_string" => {
                let path = path_arg(args, "get_string")?;
                match self.files.get_string(&path) {
                    Some(content) => Ok(Value::from(content)),
                    None => Err(Error::new(
                        ErrorKind::InvalidOperation,
                        format!("file '{}' not found in chart files", path),
                    )),
                }
            }

            "exists" => {
                let path = path_arg(args, "exists")?;
                Ok(Value::from(self.files.exists(&path)))
            }

            "paths" => {
                let paths: Vec<String> = self.files.paths().map(str::to_string).collect();
                Ok(Value::from(paths))
            }

            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!(
                    "files object has no method '{}'. Available methods: get, get_string, exists, paths",
                    method
                ),
            )),
        }
    }
}

fn path_arg(args: &[Value], method_name: &str) -> Result<String, Error> {
    args.first()
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("files.{}() requires a path string argument", method_name),
            )
        })
}

/// Create a MiniJinja Value exposing the files API to templates
pub fn create_files_value(files: StaticFiles) -> Value {
    Value::from_object(FilesObject::new(files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::Environment;
    use std::collections::BTreeMap;

    fn create_test_env() -> Environment<'static> {
        let mut map = BTreeMap::new();
        map.insert(
            "config/app.yaml".to_string(),
            b"key: value\nother: data".to_vec(),
        );
        map.insert("config/db.yaml".to_string(), b"host: localhost".to_vec());

        let mut env = Environment::new();
        env.add_global("files", create_files_value(StaticFiles::new(map)));
        env
    }

    #[test]
    fn test_files_get_string() {
        let env = create_test_env();

        let result = env
            .render_str(r#"{{ files.get_string("config/app.yaml") }}"#, ())
            .unwrap();
        assert_eq!(result, "key: value\nother: data");
    }

    #[test]
    fn test_files_exists() {
        let env = create_test_env();

        // MiniJinja stringifies booleans as True/False, which YAML 1.1
        // still parses as booleans; authors branching on existence use
        // {% if %} rather than interpolation.
        let result = env
            .render_str(r#"{{ files.exists("config/app.yaml") }}"#, ())
            .unwrap();
        assert_eq!(result, "True");

        let result = env
            .render_str(r#"{{ files.exists("nonexistent.txt") }}"#, ())
            .unwrap();
        assert_eq!(result, "False");
    }

    #[test]
    fn test_files_paths_sorted() {
        let env = create_test_env();

        let template = r#"{% for p in files.paths() %}{{ p }};{% endfor %}"#;
        let result = env.render_str(template, ()).unwrap();
        assert_eq!(result, "config/app.yaml;config/db.yaml;");
    }

    #[test]
    fn test_files_conditional() {
        let env = create_test_env();

        let template =
            r#"{% if files.exists("config/app.yaml") %}found{% else %}not found{% endif %}"#;
        let result = env.render_str(template, ()).unwrap();
        assert_eq!(result, "found");
    }

    #[test]
    fn test_files_get_not_found() {
        let env = create_test_env();

        let result = env.render_str(r#"{{ files.get_string("nonexistent.txt") }}"#, ());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_files_unknown_method() {
        let env = create_test_env();

        let result = env.render_str(r#"{{ files.unknown() }}"#, ());
        assert!(result.is_err());
    }
}
