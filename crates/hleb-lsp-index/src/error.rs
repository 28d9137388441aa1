use std::path::PathBuf;

use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid composer.json: {0}")]
    Composer(#[from] serde_json::Error),
    #[error("Path `{}` is outside the project root", path.display())]
    OutsideRoot { path: PathBuf },
    #[error("Project root is not set")]
    NoRoot,
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}
