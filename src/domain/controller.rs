//! Controller abstraction consumed by the view layer.

use serde::{Deserialize, Serialize};

const CONTROLLER_SUFFIX: &str = "Controller";

/// The parts of a controller the view layer needs to locate templates.
pub trait Controller {
    /// Request path segment mapped to the controller's namespace.
    fn context_path(&self) -> &str;

    /// Alternate context directory searched after the primary one.
    fn context_path_alias(&self) -> Option<&str>;

    /// Resolved name of the action being executed.
    fn action_name(&self) -> &str;

    /// Fully qualified type identifier of the controller.
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Controller name without namespace prefix and `Controller` suffix.
    fn base_name(&self) -> String {
        controller_base_name(self.type_name())
    }
}

/// Strips any namespace qualifier and a trailing `Controller` suffix.
///
/// `app::controllers::UserController` becomes `User`. Rust paths, backslash
/// separated and dotted qualifiers are all recognised.
pub fn controller_base_name(type_name: &str) -> String {
    let name = type_name
        .rsplit(['\\', '.', ':'])
        .next()
        .unwrap_or(type_name);
    let name = name.split('<').next().unwrap_or(name);

    match name.strip_suffix(CONTROLLER_SUFFIX) {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => name.to_string(),
    }
}

/// Plain controller description used when no concrete controller type exists.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControllerInfo {
    pub type_name: String,
    pub context_path: String,
    pub context_path_alias: Option<String>,
    pub action_name: String,
}

impl ControllerInfo {
    pub fn new(type_name: impl Into<String>, action_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            action_name: action_name.into(),
            ..Default::default()
        }
    }

    pub fn with_context_path(mut self, path: impl Into<String>) -> Self {
        self.context_path = path.into();
        self
    }

    pub fn with_context_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.context_path_alias = (!alias.is_empty()).then_some(alias);
        self
    }
}

impl Controller for ControllerInfo {
    fn context_path(&self) -> &str {
        &self.context_path
    }

    fn context_path_alias(&self) -> Option<&str> {
        self.context_path_alias.as_deref()
    }

    fn action_name(&self) -> &str {
        &self.action_name
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }
}
