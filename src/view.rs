//! Renders a controller's view through the template engine.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;
use tera::{Context, Template, Tera};
use walkdir::WalkDir;

use crate::compress::OutputTransform;
use crate::domain::controller::Controller;
use crate::errors::ViewResult;
use crate::extensions::ExtensionRegistry;
use crate::models::config::ViewConfig;
use crate::resolver::{self, FsProbe, TemplateProbe, ViewSearchRequest};

/// File extensions rendered with HTML auto-escaping.
const AUTOESCAPE_SUFFIXES: [&str; 5] = [".html", ".htm", ".xml", ".twig", ".tera"];

/// A parsed template source waiting to be added to an engine.
struct LoadedTemplate {
    name: String,
    source: String,
    parsed: Template,
    is_view: bool,
}

impl LoadedTemplate {
    fn read(path: &Path, name: String, is_view: bool) -> ViewResult<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            tera::Error::chain(format!("Couldn't read template '{}'", path.display()), e)
        })?;
        let parsed = Template::new(&name, Some(path.display().to_string()), &source)?;
        Ok(Self {
            name,
            source,
            parsed,
            is_view,
        })
    }

    /// First parent or macro file that is not among `names`.
    fn missing_dependency(&self, names: &HashSet<String>) -> Option<&str> {
        self.parsed
            .parent
            .iter()
            .chain(self.parsed.imported_macro_files.iter().map(|(file, _)| file))
            .map(String::as_str)
            .find(|dep| !names.contains(*dep))
    }
}

/// Drops templates whose parents or macro files are unavailable, repeating
/// until the set is closed. The view itself is always kept.
fn retain_loadable(templates: &mut Vec<LoadedTemplate>) {
    loop {
        let names: HashSet<String> = templates.iter().map(|t| t.name.clone()).collect();
        let before = templates.len();
        templates.retain(|template| match template.missing_dependency(&names) {
            Some(dep) if !template.is_view => {
                warn!("Skipping template `{}`: `{dep}` is not loadable", template.name);
                false
            }
            _ => true,
        });
        if templates.len() == before {
            break;
        }
    }
}

/// A single render of a controller's view.
///
/// Configuration, controller and extensions are borrowed for the lifetime of
/// the render; only the view file and parameters are owned.
pub struct View<'a> {
    config: &'a ViewConfig,
    controller: &'a dyn Controller,
    extensions: &'a ExtensionRegistry,
    probe: &'a dyn TemplateProbe,
    view_file: Option<String>,
    params: Context,
}

impl<'a> View<'a> {
    pub fn new(
        config: &'a ViewConfig,
        controller: &'a dyn Controller,
        extensions: &'a ExtensionRegistry,
    ) -> Self {
        Self {
            config,
            controller,
            extensions,
            probe: &FsProbe,
            view_file: None,
            params: Context::new(),
        }
    }

    /// Replaces the filesystem probe used to locate views.
    pub fn with_probe(mut self, probe: &'a dyn TemplateProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Explicit view identifier; empty means "derive from the action".
    pub fn set_view_file(&mut self, view_file: impl Into<String>) -> &mut Self {
        let view_file = view_file.into();
        self.view_file = (!view_file.is_empty()).then_some(view_file);
        self
    }

    /// Merges parameters supplied by the controller; later keys win.
    pub fn set_view_params(&mut self, params: Context) -> &mut Self {
        self.params.extend(params);
        self
    }

    /// Merges parameters supplied by tags; later keys win.
    pub fn set_tag_params(&mut self, params: Context) -> &mut Self {
        self.params.extend(params);
        self
    }

    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> &mut Self {
        self.params.insert(key, value);
        self
    }

    pub fn search_request(&self) -> ViewSearchRequest {
        ViewSearchRequest::new(self.config, self.controller, self.view_file.as_deref())
    }

    /// Locates the view file for the current controller and action.
    pub fn search_view(&self) -> ViewResult<PathBuf> {
        resolver::resolve(&self.search_request(), self.probe)
    }

    fn is_template(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|known| known == ext))
    }

    /// Collects `(file, name)` pairs; earlier directories win per name.
    fn template_files(&self, view_file: &Path, dirs: &[PathBuf]) -> Vec<(PathBuf, String)> {
        let mut files: Vec<(PathBuf, String)> = Vec::new();

        for dir in dirs {
            for entry in WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
            {
                let path = entry.path();
                if path != view_file && !self.is_template(path) {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(dir) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !files.iter().any(|(_, existing)| *existing == name) {
                    files.push((path.to_path_buf(), name));
                }
            }
        }
        files
    }

    /// Builds an engine instance over the template directories.
    ///
    /// The view must parse; any other template that does not is skipped with
    /// a warning so it cannot break unrelated renders.
    fn engine(&self, view_file: &Path, dirs: &[PathBuf]) -> ViewResult<Tera> {
        let mut templates = Vec::new();
        for (path, name) in self.template_files(view_file, dirs) {
            let is_view = path == view_file;
            match LoadedTemplate::read(&path, name, is_view) {
                Ok(template) => templates.push(template),
                Err(err) if is_view => return Err(err),
                Err(err) => warn!("Skipping template {}: {err}", path.display()),
            }
        }
        retain_loadable(&mut templates);

        let mut tera = Tera::default();
        tera.autoescape_on(AUTOESCAPE_SUFFIXES.to_vec());
        self.extensions.install(&mut tera);
        tera.add_raw_templates(
            templates
                .into_iter()
                .map(|template| (template.name, template.source)),
        )?;
        Ok(tera)
    }

    /// Resolves and renders the view.
    pub fn content(&self) -> ViewResult<String> {
        let request = self.search_request();
        let view_file = resolver::resolve(&request, self.probe)?;
        let dirs = resolver::template_dirs(&request, &view_file, self.probe);
        debug!("Rendering {} with template dirs {dirs:?}", view_file.display());

        let name = view_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tera = self.engine(&view_file, &dirs)?;
        Ok(tera.render(&name, &self.params)?)
    }

    /// Renders the view and minifies it for `content_type` unless in debug mode.
    pub fn output<T>(&self, content_type: &str, transform: &T) -> ViewResult<String>
    where
        T: OutputTransform + ?Sized,
    {
        let content = self.content()?;
        if self.config.debug {
            return Ok(content);
        }
        transform.transform(&content, content_type)
    }
}
