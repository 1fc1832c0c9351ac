use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Unable to find a template (looked for: {})", join_paths(.searched))]
    TemplateNotFound { searched: Vec<PathBuf> },

    #[error(transparent)]
    Template(#[from] tera::Error),

    #[error("Unknown {kind} `{name}`")]
    UnknownExtension { kind: &'static str, name: String },

    #[error("Minification error: {0}")]
    Minify(String),
}

pub type ViewResult<T> = Result<T, ViewError>;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
