//! ZCAD 外部引用的文件层
//!
//! 支持：
//! - `.fcstd` 容器文件（zip 归档，内含 `Document.xml` 描述文件和各对象的形状数据）
//! - 流式扫描描述文件，建立 部件标签 -> 形状数据路径 的索引
//! - 读取容器文件的修改时间

pub mod container;
pub mod error;
pub mod index;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use container::{is_container_path, modified_time, ContainerArchive};
pub use error::FileError;
pub use index::{scan, PartIndex};
