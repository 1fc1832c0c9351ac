use std::collections::HashMap;

use crate::compress::{CSS_CONTENT_TYPE, JAVASCRIPT_CONTENT_TYPES};
use crate::domain::controller::ControllerInfo;
use crate::domain::naming::to_pascal;
use crate::extensions::ExtensionRegistry;
use crate::models::config::ViewConfig;

pub mod views;

pub const DEFAULT_CONTROLLER: &str = "home";
pub const DEFAULT_ACTION: &str = "index";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Shared state handed to view routes.
#[derive(Clone, Debug)]
pub struct ViewState {
    pub config: ViewConfig,
    pub extensions: ExtensionRegistry,
    pub context_aliases: HashMap<String, String>,
}

/// What a request path maps to.
#[derive(Debug, PartialEq, Eq)]
pub struct RouteTarget {
    pub controller: ControllerInfo,
    pub view_file: Option<String>,
    pub content_type: &'static str,
}

fn is_unsafe_segment(segment: &str) -> bool {
    segment == "." || segment == ".." || segment.contains('\\')
}

/// Splits `[context...]/controller/action[.js|.css]` into a route target.
///
/// Returns `None` when a segment could navigate out of the view root.
pub fn parse_route(path: &str, aliases: &HashMap<String, String>) -> Option<RouteTarget> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|segment| is_unsafe_segment(segment)) {
        return None;
    }

    let action = segments.pop().unwrap_or(DEFAULT_ACTION);
    let controller = segments.pop().unwrap_or(DEFAULT_CONTROLLER);
    let context = segments.join("/");

    let (action, view_file, content_type) = match action.rsplit_once('.') {
        Some((stem, "js")) => (stem, Some(action.to_string()), JAVASCRIPT_CONTENT_TYPES[0]),
        Some((stem, "css")) => (stem, Some(action.to_string()), CSS_CONTENT_TYPE),
        _ => (action, None, HTML_CONTENT_TYPE),
    };

    let mut info = ControllerInfo::new(format!("{}Controller", to_pascal(controller)), action)
        .with_context_path(context.as_str());
    if let Some(alias) = aliases.get(&context) {
        info = info.with_context_alias(alias.as_str());
    }

    Some(RouteTarget {
        controller: info,
        view_file,
        content_type,
    })
}
