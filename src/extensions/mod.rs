//! Filters and functions installed into the template engine.
//!
//! Entries are kept in registration order. Registering a name that already
//! exists for the same kind replaces the callable but keeps its position, so
//! configuration and application code can override the defaults.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tera::{Tera, Value};

use crate::errors::{ViewError, ViewResult};
use crate::models::config::ViewConfig;
use crate::pagination::{PaginationFunction, PaginationRequest};

pub mod filters;
pub mod statics;

use statics::{StaticFunction, StaticRegistry};

pub type FilterFn =
    Arc<dyn Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;
pub type FunctionFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Filter,
    Function,
}

impl ExtensionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionKind::Filter => "filter",
            ExtensionKind::Function => "function",
        }
    }
}

/// A callable exposed to templates.
#[derive(Clone)]
pub enum Extension {
    Filter(FilterFn),
    Function(FunctionFn),
    /// Multi-argument pagination function with its own argument defaults.
    Pagination(PaginationRequest),
    Static(Arc<StaticRegistry>),
}

impl Extension {
    pub fn filter<F>(filter: F) -> Self
    where
        F: Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        Extension::Filter(Arc::new(filter))
    }

    pub fn function<F>(function: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        Extension::Function(Arc::new(function))
    }

    pub fn kind(&self) -> ExtensionKind {
        match self {
            Extension::Filter(_) => ExtensionKind::Filter,
            Extension::Function(_) | Extension::Pagination(_) | Extension::Static(_) => {
                ExtensionKind::Function
            }
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Filter(_) => f.write_str("Filter(..)"),
            Extension::Function(_) => f.write_str("Function(..)"),
            Extension::Pagination(defaults) => f.debug_tuple("Pagination").field(defaults).finish(),
            Extension::Static(registry) => f.debug_tuple("Static").field(registry).finish(),
        }
    }
}

struct RegisteredFilter(FilterFn);

impl tera::Filter for RegisteredFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        (self.0)(value, args)
    }
}

struct RegisteredFunction(FunctionFn);

impl tera::Function for RegisteredFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        (self.0)(args)
    }
}

/// Built-in filter by name, if one exists.
pub fn builtin_filter(name: &str) -> Option<Extension> {
    match name {
        "formatNumber" => Some(Extension::filter(filters::format_number)),
        "formatTimestamp" => Some(Extension::filter(filters::format_timestamp)),
        _ => None,
    }
}

/// Built-in function by name, if one exists.
pub fn builtin_function(name: &str) -> Option<Extension> {
    match name {
        "pagination" => Some(Extension::Pagination(PaginationRequest::default())),
        _ => None,
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExtensionRegistry {
    entries: Vec<(String, Extension)>,
}

impl ExtensionRegistry {
    /// Empty registry without any defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `static` function and the default filters and
    /// functions.
    pub fn with_defaults(statics: StaticRegistry) -> Self {
        let mut registry = Self::new();
        registry.register("static", Extension::Static(Arc::new(statics)));
        for name in ["formatNumber", "formatTimestamp"] {
            if let Some(filter) = builtin_filter(name) {
                registry.register(name, filter);
            }
        }
        if let Some(pagination) = builtin_function("pagination") {
            registry.register("pagination", pagination);
        }
        registry
    }

    /// Defaults followed by the aliases declared in configuration.
    pub fn from_config(config: &ViewConfig, statics: StaticRegistry) -> ViewResult<Self> {
        let mut registry = Self::with_defaults(statics);
        registry.apply_config(config)?;
        Ok(registry)
    }

    /// Registers the configured `name -> built-in` aliases.
    pub fn apply_config(&mut self, config: &ViewConfig) -> ViewResult<()> {
        for (name, target) in &config.filters {
            let filter = builtin_filter(target).ok_or_else(|| ViewError::UnknownExtension {
                kind: ExtensionKind::Filter.as_str(),
                name: target.clone(),
            })?;
            self.register(name, filter);
        }
        for (name, target) in &config.functions {
            let function = builtin_function(target).ok_or_else(|| ViewError::UnknownExtension {
                kind: ExtensionKind::Function.as_str(),
                name: target.clone(),
            })?;
            self.register(name, function);
        }
        Ok(())
    }

    /// Adds an extension or replaces the one of the same kind and name.
    pub fn register(&mut self, name: &str, extension: Extension) -> &mut Self {
        let kind = extension.kind();
        match self
            .entries
            .iter_mut()
            .find(|(existing, ext)| existing == name && ext.kind() == kind)
        {
            Some(entry) => entry.1 = extension,
            None => self.entries.push((name.to_string(), extension)),
        }
        self
    }

    pub fn get(&self, kind: ExtensionKind, name: &str) -> Option<&Extension> {
        self.entries
            .iter()
            .find(|(existing, ext)| existing == name && ext.kind() == kind)
            .map(|(_, ext)| ext)
    }

    /// Registered names of one kind, in registration order.
    pub fn names(&self, kind: ExtensionKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, ext)| ext.kind() == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Installs every entry into a template engine instance.
    pub fn install(&self, tera: &mut Tera) {
        for (name, extension) in &self.entries {
            match extension {
                Extension::Filter(filter) => {
                    tera.register_filter(name, RegisteredFilter(filter.clone()));
                }
                Extension::Function(function) => {
                    tera.register_function(name, RegisteredFunction(function.clone()));
                }
                Extension::Pagination(defaults) => {
                    tera.register_function(name, PaginationFunction::new(defaults.clone()));
                }
                Extension::Static(registry) => {
                    tera.register_function(name, StaticFunction::new(registry.clone()));
                }
            }
        }
    }
}
