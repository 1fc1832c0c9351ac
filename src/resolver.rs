//! Convention-based lookup of view files.
//!
//! A view is searched under the view root in the following order:
//!
//! 1. Identifiers starting with `/` are relative to the base directory and
//!    produce exactly one candidate.
//! 2. Otherwise a list of naming variants is derived from the identifier (or
//!    from the controller and action when none is given), deduplicated,
//!    expanded with every recognised extension and finally placed under the
//!    context directory, the context alias directory and the view root.
//!
//! The first candidate that exists wins. Candidates that would leave their
//! root directory through `..` are never probed.

use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::domain::controller::Controller;
use crate::domain::naming::{lower_first, to_underline};
use crate::errors::{ViewError, ViewResult};
use crate::models::config::ViewConfig;

/// Marks a view identifier as relative to the base directory.
pub const ROOT_MARKER: char = '/';

/// Everything needed to search for a single view.
#[derive(Clone, Debug, Default)]
pub struct ViewSearchRequest {
    pub view_file: Option<String>,
    pub controller_name: String,
    pub action_name: String,
    pub context_dir: String,
    pub context_alias_dir: Option<String>,
    pub base_dir: PathBuf,
    pub view_root: PathBuf,
    pub extensions: Vec<String>,
    pub search_dirs: Vec<PathBuf>,
}

impl ViewSearchRequest {
    /// Collects the search inputs from configuration and the active controller.
    pub fn new(config: &ViewConfig, controller: &dyn Controller, view_file: Option<&str>) -> Self {
        let context_alias_dir = controller
            .context_path_alias()
            .map(|alias| alias.trim_matches('/'))
            .filter(|alias| !alias.is_empty())
            .map(str::to_string);

        Self {
            view_file: view_file.filter(|f| !f.is_empty()).map(str::to_string),
            controller_name: controller.base_name(),
            action_name: controller.action_name().to_string(),
            context_dir: controller.context_path().trim_matches('/').to_string(),
            context_alias_dir,
            base_dir: config.base_dir.clone(),
            view_root: config.view_root(),
            extensions: config.extensions.clone(),
            search_dirs: config.paths.clone(),
        }
    }

    /// Absolute context directory, if the controller has one.
    pub fn context_root(&self) -> Option<PathBuf> {
        (!self.context_dir.is_empty()).then(|| self.view_root.join(&self.context_dir))
    }

    /// Absolute context alias directory, if the controller has one.
    pub fn context_alias_root(&self) -> Option<PathBuf> {
        self.context_alias_dir
            .as_ref()
            .map(|alias| self.view_root.join(alias))
    }

    fn root_relative(&self) -> Option<&str> {
        self.view_file
            .as_deref()
            .filter(|file| file.starts_with(ROOT_MARKER))
    }

    /// Directory every candidate of this request must stay under.
    pub fn confinement_root(&self) -> &Path {
        if self.root_relative().is_some() {
            &self.base_dir
        } else {
            &self.view_root
        }
    }
}

/// Resolves `.` and `..` without touching the filesystem.
///
/// Returns `None` when a `..` would climb above the start of the path.
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    return None;
                }
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Some(normalized)
}

/// Whether `path` stays inside `root` once `.` and `..` are resolved.
pub fn is_within(path: &Path, root: &Path) -> bool {
    match (lexical_normalize(path), lexical_normalize(root)) {
        (Some(path), Some(root)) => path.starts_with(root),
        _ => false,
    }
}

/// Filesystem existence checks used while scanning candidates.
pub trait TemplateProbe {
    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsProbe;

impl TemplateProbe for FsProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Naming variants before deduplication, in search order.
pub fn naming_variants(request: &ViewSearchRequest) -> Vec<String> {
    let controller = &request.controller_name;
    let controller_lower = lower_first(controller);
    let controller_underline = to_underline(controller);

    match request.view_file.as_deref() {
        None => {
            let action = &request.action_name;
            let action_underline = to_underline(action);
            vec![
                format!("{controller}/{action}"),
                format!("{controller}/{action_underline}"),
                format!("{controller_lower}/{action}"),
                format!("{controller_lower}/{action_underline}"),
                format!("{controller_underline}/{action}"),
                format!("{controller_underline}/{action_underline}"),
            ]
        }
        Some(file) if !file.contains('/') => vec![
            format!("{controller}/{file}"),
            format!("{controller_lower}/{file}"),
            format!("{controller_underline}/{file}"),
        ],
        Some(file) => vec![file.to_string()],
    }
}

/// Removes repeated variants while keeping the first occurrence in place.
pub fn unique_variants(variants: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(variants.len());
    for variant in variants {
        if !unique.contains(&variant) {
            unique.push(variant);
        }
    }
    unique
}

/// Appends every recognised extension to variants that do not carry one.
pub fn expand_extensions(variants: &[String], extensions: &[String]) -> Vec<String> {
    variants
        .iter()
        .flat_map(|variant| {
            if Path::new(variant).extension().is_some() {
                vec![variant.clone()]
            } else {
                extensions
                    .iter()
                    .map(|ext| format!("{variant}.{ext}"))
                    .collect()
            }
        })
        .collect()
}

/// Master search list in the exact order candidates are probed.
pub fn candidate_paths(request: &ViewSearchRequest) -> Vec<PathBuf> {
    if let Some(file) = request.root_relative() {
        return vec![request.base_dir.join(file.trim_start_matches(ROOT_MARKER))];
    }

    let variants = unique_variants(naming_variants(request));
    let files = expand_extensions(&variants, &request.extensions);
    let context_root = request.context_root();
    let alias_root = request.context_alias_root();

    let mut paths = Vec::with_capacity(files.len() * 3);
    for file in &files {
        if let Some(dir) = &context_root {
            paths.push(dir.join(file));
        }
        if let Some(dir) = &alias_root {
            paths.push(dir.join(file));
        }
        paths.push(request.view_root.join(file));
    }
    paths
}

/// Returns the first candidate that exists.
pub fn resolve<P>(request: &ViewSearchRequest, probe: &P) -> ViewResult<PathBuf>
where
    P: TemplateProbe + ?Sized,
{
    let candidates = candidate_paths(request);
    debug!("Searching view among {} candidates: {candidates:?}", candidates.len());

    let root = request.confinement_root();
    match candidates
        .iter()
        .find(|path| is_within(path, root) && probe.is_file(path))
    {
        Some(found) => Ok(found.clone()),
        None => Err(ViewError::TemplateNotFound {
            searched: candidates,
        }),
    }
}

/// Directories the template engine loads from once a view has been resolved.
///
/// The directory of the resolved view comes first, followed by configured
/// search paths, the view root, the context and the context alias
/// directories. Missing and repeated directories are skipped.
pub fn template_dirs<P>(request: &ViewSearchRequest, view_file: &Path, probe: &P) -> Vec<PathBuf>
where
    P: TemplateProbe + ?Sized,
{
    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(parent) = view_file.parent() {
        dirs.push(parent.to_path_buf());
    }

    let extra = request
        .search_dirs
        .iter()
        .cloned()
        .chain(std::iter::once(request.view_root.clone()))
        .chain(
            request
                .context_root()
                .filter(|dir| is_within(dir, &request.view_root)),
        )
        .chain(
            request
                .context_alias_root()
                .filter(|dir| is_within(dir, &request.view_root)),
        );

    for dir in extra {
        if !dirs.contains(&dir) && probe.is_dir(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Default)]
    struct StubProbe {
        files: HashSet<PathBuf>,
        dirs: HashSet<PathBuf>,
    }

    impl StubProbe {
        fn with_file(mut self, path: &str) -> Self {
            self.files.insert(PathBuf::from(path));
            self
        }

        fn with_dir(mut self, path: &str) -> Self {
            self.dirs.insert(PathBuf::from(path));
            self
        }
    }

    impl TemplateProbe for StubProbe {
        fn is_file(&self, path: &Path) -> bool {
            self.files.contains(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.dirs.contains(path)
        }
    }

    fn request(view_file: Option<&str>) -> ViewSearchRequest {
        ViewSearchRequest {
            view_file: view_file.map(str::to_string),
            controller_name: "UserProfile".to_string(),
            action_name: "showAll".to_string(),
            context_dir: "admin".to_string(),
            context_alias_dir: Some("backend".to_string()),
            base_dir: PathBuf::from("/app"),
            view_root: PathBuf::from("/app/Views"),
            extensions: vec!["html".to_string(), "twig".to_string()],
            search_dirs: vec![],
        }
    }

    #[test]
    fn six_variants_without_view_file() {
        let variants = naming_variants(&request(None));

        assert_eq!(
            variants,
            vec![
                "UserProfile/showAll",
                "UserProfile/show_all",
                "userProfile/showAll",
                "userProfile/show_all",
                "user_profile/showAll",
                "user_profile/show_all",
            ]
        );
    }

    #[test]
    fn user_controller_list_variants_and_dedup() {
        let mut req = request(None);
        req.controller_name = "User".to_string();
        req.action_name = "list".to_string();

        let variants = naming_variants(&req);
        assert_eq!(
            variants,
            vec![
                "User/list",
                "User/list",
                "user/list",
                "user/list",
                "user/list",
                "user/list",
            ]
        );
        assert_eq!(unique_variants(variants), vec!["User/list", "user/list"]);
    }

    #[test]
    fn bare_view_file_is_prefixed_with_controller() {
        let variants = naming_variants(&request(Some("edit")));

        assert_eq!(
            variants,
            vec!["UserProfile/edit", "userProfile/edit", "user_profile/edit"]
        );
    }

    #[test]
    fn view_file_with_directory_is_kept() {
        assert_eq!(
            naming_variants(&request(Some("shared/menu.html"))),
            vec!["shared/menu.html"]
        );
    }

    #[test]
    fn extensions_only_added_when_missing() {
        let variants = vec!["a/b".to_string(), "a/c.js".to_string()];
        let extensions = vec!["html".to_string(), "twig".to_string()];

        assert_eq!(
            expand_extensions(&variants, &extensions),
            vec!["a/b.html", "a/b.twig", "a/c.js"]
        );
    }

    #[test]
    fn candidates_try_every_directory_before_next_file() {
        let paths = candidate_paths(&request(Some("shared/menu")));

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/app/Views/admin/shared/menu.html"),
                PathBuf::from("/app/Views/backend/shared/menu.html"),
                PathBuf::from("/app/Views/shared/menu.html"),
                PathBuf::from("/app/Views/admin/shared/menu.twig"),
                PathBuf::from("/app/Views/backend/shared/menu.twig"),
                PathBuf::from("/app/Views/shared/menu.twig"),
            ]
        );
    }

    #[test]
    fn candidates_skip_empty_context_dirs() {
        let mut req = request(Some("shared/menu.html"));
        req.context_dir = String::new();
        req.context_alias_dir = None;

        assert_eq!(
            candidate_paths(&req),
            vec![PathBuf::from("/app/Views/shared/menu.html")]
        );
    }

    #[test]
    fn root_relative_view_file_yields_single_candidate() {
        let req = request(Some("/themes/base.html"));

        assert_eq!(
            candidate_paths(&req),
            vec![PathBuf::from("/app/themes/base.html")]
        );

        let err = resolve(&req, &StubProbe::default()).unwrap_err();
        match err {
            ViewError::TemplateNotFound { searched } => {
                assert_eq!(searched, vec![PathBuf::from("/app/themes/base.html")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_prefers_context_dir_over_root() {
        let probe = StubProbe::default()
            .with_file("/app/Views/user_profile/show_all.html")
            .with_file("/app/Views/backend/user_profile/show_all.html");

        let found = resolve(&request(None), &probe).unwrap();

        assert_eq!(found, PathBuf::from("/app/Views/backend/user_profile/show_all.html"));
    }

    #[test]
    fn resolve_prefers_earlier_variant_over_earlier_directory() {
        let probe = StubProbe::default()
            .with_file("/app/Views/UserProfile/showAll.twig")
            .with_file("/app/Views/admin/UserProfile/show_all.html");

        let found = resolve(&request(None), &probe).unwrap();

        assert_eq!(found, PathBuf::from("/app/Views/UserProfile/showAll.twig"));
    }

    #[test]
    fn not_found_carries_full_search_list() {
        let req = request(None);
        let err = resolve(&req, &StubProbe::default()).unwrap_err();

        match err {
            ViewError::TemplateNotFound { searched } => {
                // 6 variants x 2 extensions x 3 directories
                assert_eq!(searched.len(), 36);
                assert_eq!(searched, candidate_paths(&req));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn is_within_resolves_parent_components() {
        let root = Path::new("/app/Views");

        assert!(is_within(Path::new("/app/Views/admin/../user/list.html"), root));
        assert!(is_within(Path::new("/app/Views/./user/list.html"), root));
        assert!(!is_within(Path::new("/app/Views/../secret/note.css"), root));
        assert!(!is_within(Path::new("/app/Views/../Views2/x.html"), root));
        assert!(!is_within(Path::new("Views/../../x.html"), Path::new("Views")));
    }

    #[test]
    fn candidates_outside_the_view_root_are_never_probed() {
        let mut req = request(Some("../../secret/note.css"));
        req.context_dir = String::new();
        req.context_alias_dir = None;
        let probe = StubProbe::default().with_file("/secret/note.css");

        let err = resolve(&req, &probe).unwrap_err();

        match err {
            ViewError::TemplateNotFound { searched } => {
                assert_eq!(searched, vec![PathBuf::from("/app/Views/../../secret/note.css")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn context_dirs_cannot_escape_the_view_root() {
        let mut req = request(None);
        req.context_dir = "../..".to_string();
        req.context_alias_dir = Some("../other".to_string());
        let probe = StubProbe::default()
            .with_file("/user_profile/show_all.html")
            .with_file("/app/other/user_profile/show_all.html")
            .with_dir("/")
            .with_dir("/app/other")
            .with_dir("/app/Views");

        assert!(resolve(&req, &probe).is_err());
        assert_eq!(
            template_dirs(&req, Path::new("/app/Views/User/list.html"), &probe),
            vec![PathBuf::from("/app/Views/User"), PathBuf::from("/app/Views")]
        );
    }

    #[test]
    fn root_relative_view_file_stays_under_base_dir() {
        let req = request(Some("/../etc/passwd.html"));
        let probe = StubProbe::default().with_file("/etc/passwd.html");

        assert!(resolve(&req, &probe).is_err());
    }

    #[test]
    fn template_dirs_skip_missing_and_repeated() {
        let mut req = request(None);
        req.search_dirs = vec![PathBuf::from("/shared"), PathBuf::from("/missing")];
        let probe = StubProbe::default()
            .with_dir("/shared")
            .with_dir("/app/Views")
            .with_dir("/app/Views/admin");

        let dirs = template_dirs(&req, Path::new("/app/Views/admin/User/list.html"), &probe);

        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/app/Views/admin/User"),
                PathBuf::from("/shared"),
                PathBuf::from("/app/Views"),
                PathBuf::from("/app/Views/admin"),
            ]
        );
    }
}
