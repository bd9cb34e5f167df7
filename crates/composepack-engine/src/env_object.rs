//! MiniJinja integration for the render's environment snapshot
//!
//! Templates read environment variables through the `env` value, either
//! by attribute or by calling it with an optional fallback:
//!
//! ```jinja2
//! {# Attribute access, errors in strict mode when unset #}
//! database_url: {{ env.DATABASE_URL }}
//!
//! {# Lookup with a fallback for unset variables #}
//! log_level: {{ env("LOG_LEVEL", "info") }}
//! ```
//!
//! The snapshot is captured by the caller once per invocation, so a
//! render never reads the process environment directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::{Enumerator, Object, ObjectRepr, Value, from_args};
use minijinja::{Error, State};

/// MiniJinja Object wrapper over an environment snapshot
#[derive(Debug)]
pub struct EnvObject {
    vars: BTreeMap<String, String>,
}

impl EnvObject {
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}

impl Object for EnvObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let name = key.as_str()?;
        self.vars.get(name).map(|v| Value::from(v.as_str()))
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        let keys: Vec<Value> = self.vars.keys().map(|k| Value::from(k.as_str())).collect();
        Enumerator::Values(keys)
    }

    /// `env(name)` or `env(name, default)`; unset without a default
    /// resolves to an empty string.
    fn call(self: &Arc<Self>, _state: &State, args: &[Value]) -> Result<Value, Error> {
        let (name, default): (String, Option<String>) = from_args(args)?;
        let value = self
            .vars
            .get(&name)
            .cloned()
            .or(default)
            .unwrap_or_default();
        Ok(Value::from(value))
    }
}

/// Create a MiniJinja Value exposing the environment snapshot
pub fn create_env_value(vars: BTreeMap<String, String>) -> Value {
    Value::from_object(EnvObject::new(vars))
}
