//! 外部引用相关的用户偏好设置

use crate::error::ReferenceError;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use xref_file::FileError;

/// 默认检查间隔（秒）
pub const DEFAULT_CHECK_INTERVAL: u64 = 60;

/// 偏好设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// 检查源文件变化的间隔（秒）
    pub reference_check_interval: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            reference_check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl Preferences {
    /// 从 JSON 文件加载；文件不存在时使用默认值
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No preferences at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(FileError::Io(e).into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// 检查间隔；配置为 0 时退回默认值
    pub fn check_interval(&self) -> Duration {
        if self.reference_check_interval == 0 {
            warn!(
                "Reference check interval of 0 is invalid, using {}s",
                DEFAULT_CHECK_INTERVAL
            );
            return Duration::from_secs(DEFAULT_CHECK_INTERVAL);
        }
        Duration::from_secs(self.reference_check_interval)
    }
}
