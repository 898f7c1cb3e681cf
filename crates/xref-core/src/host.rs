//! 宿主应用提供的协作接口
//!
//! 引用对象不访问任何全局的活动文档或界面状态，所需能力都由宿主注入。

use crate::object::ReferenceId;
use std::io;
use std::path::Path;

/// 文档重算调度
pub trait RecomputeScheduler {
    /// 请求宿主在下一次机会重算指定引用对象
    fn request_recompute(&self, id: ReferenceId);
}

/// 打开文档
pub trait DocumentOpener {
    fn open_document(&self, path: &Path) -> io::Result<()>;
}
