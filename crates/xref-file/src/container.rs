//! 容器文件（.fcstd）访问
//!
//! 容器是一个 zip 归档：
//! - `Document.xml`：文档描述文件
//! - 若干二进制条目：各对象形状的 BREP 数据，由描述文件按路径引用

use crate::error::FileError;
use crate::index::{read_index, PartIndex};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use zip::result::ZipError;
use zip::ZipArchive;

/// 容器文件扩展名（不区分大小写）
pub const CONTAINER_EXTENSION: &str = "fcstd";

/// 描述文件在归档中的条目名
pub const DESCRIPTOR_ENTRY: &str = "Document.xml";

/// 读取条目时按声明大小预分配的上限
const MAX_PREALLOC: u64 = 1 << 20;

/// 路径是否带有容器扩展名
pub fn is_container_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(CONTAINER_EXTENSION))
}

/// 读取文件修改时间（自 Unix 纪元起的秒数）
pub fn modified_time(path: impl AsRef<Path>) -> Result<f64, FileError> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| not_found(path, e))?;
    let modified = metadata.modified()?;

    let seconds = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    };
    Ok(seconds)
}

fn not_found(path: &Path, e: io::Error) -> FileError {
    if e.kind() == io::ErrorKind::NotFound {
        FileError::FileNotFound(path.to_path_buf())
    } else {
        FileError::Io(e)
    }
}

/// 已打开的容器归档
pub struct ContainerArchive {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl ContainerArchive {
    /// 打开容器文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();

        if !is_container_path(path) {
            return Err(FileError::NotAContainer(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| not_found(path, e))?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| FileError::corrupt(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// 容器文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 归档中的所有条目名
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// 归档中是否存在指定条目
    pub fn contains(&self, entry: &str) -> bool {
        self.archive.index_for_name(entry).is_some()
    }

    /// 以行缓冲方式流式读取描述文件
    pub fn descriptor(&mut self) -> Result<impl BufRead + '_, FileError> {
        match self.archive.by_name(DESCRIPTOR_ENTRY) {
            Ok(file) => Ok(BufReader::new(file)),
            Err(ZipError::FileNotFound) => Err(FileError::MissingDescriptor(self.path.clone())),
            Err(e) => Err(FileError::corrupt(&self.path, e)),
        }
    }

    /// 扫描描述文件，建立部件索引
    pub fn part_index(&mut self) -> Result<PartIndex, FileError> {
        let reader = self.descriptor()?;
        Ok(read_index(reader)?)
    }

    /// 完整读取一个形状数据条目
    pub fn read_blob(&mut self, entry: &str) -> Result<Vec<u8>, FileError> {
        let mut file = match self.archive.by_name(entry) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(FileError::BlobMissing {
                    path: self.path.clone(),
                    entry: entry.to_string(),
                })
            }
            Err(e) => return Err(FileError::corrupt(&self.path, e)),
        };

        // 条目头中的大小不可信
        let mut data = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl std::fmt::Debug for ContainerArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerArchive")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}
