//! Closed registry backing the `static` template function.
//!
//! Templates address members as `Class::$property` or `Class::method`. Only
//! members registered up front are reachable; anything else evaluates to
//! null.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tera::Value;

pub type StaticMethod = Arc<dyn Fn(&[Value]) -> tera::Result<Value> + Send + Sync>;

const PROPERTY_SIGIL: char = '$';

#[derive(Clone)]
pub enum StaticMember {
    Property(Value),
    Method(StaticMethod),
}

impl fmt::Debug for StaticMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticMember::Property(value) => f.debug_tuple("Property").field(value).finish(),
            StaticMember::Method(_) => f.write_str("Method(..)"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    members: HashMap<(String, String), StaticMember>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes `class::$name` with a fixed value.
    pub fn property(mut self, class: &str, name: &str, value: impl Into<Value>) -> Self {
        self.members.insert(
            (class.to_string(), format!("{PROPERTY_SIGIL}{name}")),
            StaticMember::Property(value.into()),
        );
        self
    }

    /// Exposes `class::name` as a callable.
    pub fn method<F>(mut self, class: &str, name: &str, method: F) -> Self
    where
        F: Fn(&[Value]) -> tera::Result<Value> + Send + Sync + 'static,
    {
        self.members.insert(
            (class.to_string(), name.to_string()),
            StaticMember::Method(Arc::new(method)),
        );
        self
    }

    /// Evaluates a `Class::member` reference. Unknown members yield null.
    pub fn access(&self, reference: &str, params: &[Value]) -> tera::Result<Value> {
        let Some((class, member)) = reference.split_once("::") else {
            return Ok(Value::Null);
        };

        match self.members.get(&(class.to_string(), member.to_string())) {
            Some(StaticMember::Property(value)) if member.starts_with(PROPERTY_SIGIL) => {
                Ok(value.clone())
            }
            Some(StaticMember::Method(method)) if !member.starts_with(PROPERTY_SIGIL) => {
                method(params)
            }
            _ => Ok(Value::Null),
        }
    }
}

/// `static(name="Class::member", args=[...])`
#[derive(Clone, Debug, Default)]
pub struct StaticFunction {
    registry: Arc<StaticRegistry>,
}

impl StaticFunction {
    pub fn new(registry: Arc<StaticRegistry>) -> Self {
        Self { registry }
    }
}

impl tera::Function for StaticFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let reference = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("Function `static` requires a `name` string"))?;

        let params = match args.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values.clone(),
            Some(single) => vec![single.clone()],
        };

        self.registry.access(reference, &params)
    }
}
