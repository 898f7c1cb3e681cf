//! ZCAD 外部引用核心
//!
//! 外部引用对象从另一个文档文件中的指定部件导入形状。
//!
//! # 架构设计
//!
//! - `ReferenceTarget`: 声明的引用（文件路径 + 部件标签）
//! - `Resolver`: 持有脏标记和最近一次的部件索引，按需解析出形状
//! - `ExternalReference`: 宿主文档中的引用对象
//! - `ChangeDetector`: 定时检查源文件修改时间，发现变化时标记重新加载
//!
//! 几何内核、文档重算和打开文档都通过 `host` 与 `shape` 中的 trait 注入。
//!
//! # 示例
//!
//! ```rust,no_run
//! use xref_core::prelude::*;
//!
//! let mut reference = make_reference(
//!     BrepDecoder,
//!     Some(std::path::Path::new("house.FCStd")),
//!     Some("Wall001"),
//!     DEFAULT_LABEL,
//! );
//! reference.execute();
//! ```

pub mod detector;
pub mod error;
pub mod host;
pub mod object;
pub mod preferences;
pub mod resolver;
pub mod shape;
pub mod target;

pub use error::ReferenceError;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::detector::{ChangeDetector, ModificationClock, PollOutcome};
    pub use crate::error::ReferenceError;
    pub use crate::host::{DocumentOpener, RecomputeScheduler};
    pub use crate::object::{
        make_reference, ExternalReference, Property, ReferenceId, ReferenceRecord, DEFAULT_LABEL,
    };
    pub use crate::preferences::Preferences;
    pub use crate::resolver::{ResolveOutcome, Resolver};
    pub use crate::shape::{BrepDecoder, BrepShape, DecodeError, ShapeDecoder};
    pub use crate::target::ReferenceTarget;
}
