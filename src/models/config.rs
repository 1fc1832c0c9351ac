//! Configuration model loaded from external sources.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_VIEW_DIR: &str = "Views";

fn default_extensions() -> Vec<String> {
    vec!["html".to_string(), "twig".to_string(), "tera".to_string()]
}

/// Settings that control where views are searched and how they are rendered.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Framework base directory; root-relative view files resolve against it.
    pub base_dir: PathBuf,
    /// View root relative to `base_dir`.
    pub default_view_dir: String,
    /// Extra template directories handed to the engine.
    pub paths: Vec<PathBuf>,
    /// Recognised template extensions, in search order.
    pub extensions: Vec<String>,
    /// Exposed filter name to built-in filter name.
    pub filters: BTreeMap<String, String>,
    /// Exposed function name to built-in function name.
    pub functions: BTreeMap<String, String>,
    /// Debug mode disables output minification.
    pub debug: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            default_view_dir: DEFAULT_VIEW_DIR.to_string(),
            paths: Vec::new(),
            extensions: default_extensions(),
            filters: BTreeMap::new(),
            functions: BTreeMap::new(),
            debug: false,
        }
    }
}

impl ViewConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Absolute view root: `base_dir` joined with the trimmed view directory.
    pub fn view_root(&self) -> PathBuf {
        let dir = self.default_view_dir.trim_matches('/');
        let dir = if dir.is_empty() { DEFAULT_VIEW_DIR } else { dir };
        self.base_dir.join(dir)
    }
}

/// Settings for the demo HTTP server.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub assets_dir: Option<String>,
    #[serde(default)]
    pub context_aliases: HashMap<String, String>,
    #[serde(default)]
    pub view: ViewConfig,
}
