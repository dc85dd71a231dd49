//! Domain-specific errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning host input into a selection forest.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selected path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("selected path is not accessible: {path}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
