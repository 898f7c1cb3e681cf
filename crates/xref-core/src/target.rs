//! 引用目标

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 声明的外部引用：源文件 + 部件标签
///
/// 两个字段都非空时才会尝试解析。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTarget {
    /// 容器文件路径（绝对或相对）
    pub source_path: PathBuf,

    /// 部件标签
    pub part_label: String,
}

impl ReferenceTarget {
    pub fn new(source_path: impl Into<PathBuf>, part_label: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            part_label: part_label.into(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn part_label(&self) -> &str {
        &self.part_label
    }

    pub fn has_source(&self) -> bool {
        !self.source_path.as_os_str().is_empty()
    }

    /// 文件和部件是否都已设置
    pub fn is_complete(&self) -> bool {
        self.has_source() && !self.part_label.is_empty()
    }
}
