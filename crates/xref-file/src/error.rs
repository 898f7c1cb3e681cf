//! 文件操作错误定义

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Not a container file: {}", .0.display())]
    NotAContainer(PathBuf),

    #[error("Corrupt archive {}: {source}", path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Missing document descriptor in {}", .0.display())]
    MissingDescriptor(PathBuf),

    #[error("Shape data '{entry}' missing from {}", path.display())]
    BlobMissing { path: PathBuf, entry: String },
}

impl FileError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        FileError::CorruptArchive {
            path: path.into(),
            source,
        }
    }
}
