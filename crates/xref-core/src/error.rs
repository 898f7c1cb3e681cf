//! 引用解析错误定义

use crate::shape::DecodeError;
use std::path::PathBuf;
use thiserror::Error;
use xref_file::FileError;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("Part '{label}' not found in {}", file.display())]
    PartNotFound { label: String, file: PathBuf },

    #[error("Shape decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Preferences error: {0}")]
    Preferences(#[from] serde_json::Error),
}

impl ReferenceError {
    /// 部件缺失（索引中没有，或索引指向的数据条目不存在）
    pub fn is_missing_part(&self) -> bool {
        matches!(
            self,
            ReferenceError::PartNotFound { .. } | ReferenceError::File(FileError::BlobMissing { .. })
        )
    }
}
