//! 部件索引扫描
//!
//! 不做完整的 XML 解析，而是逐行扫描描述文件：
//! - `<Property name="Label"` 之后第一行 `<String value="...">` 给出部件标签
//! - `<Property name="Shape" type="Part::PropertyPartShape"` 之后第一行
//!   `<Part file="...">` 给出形状数据在归档中的路径
//!
//! 两个捕获相互独立，只要自上次输出以来两者都已捕获，就输出一对并清空。
//! 这种配对方式比较宽松：缺少某个标记的对象无法被识别出来，
//! 重复的标签以最后一次出现为准。
//!
//! 空值（`value=""` 或 `file=""`）也算一次捕获并参与配对，
//! 但配出的这一对不进入索引，避免空值让后面的对象错配。

use crate::container::{is_container_path, ContainerArchive};
use crate::error::FileError;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::Path;
use tracing::debug;

const LABEL_MARKER: &str = "<Property name=\"Label\"";
const LABEL_VALUE: &str = "<String value=";
const SHAPE_MARKER: &str = "<Property name=\"Shape\" type=\"Part::PropertyPartShape\"";
const SHAPE_VALUE: &str = "<Part file=";

/// 部件标签到形状数据路径的映射
///
/// 每次扫描都重新构建，构建完成后不再修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartIndex {
    entries: BTreeMap<String, String>,
}

impl PartIndex {
    /// 创建空索引
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找部件的形状数据路径
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(label).map(String::as_str)
    }

    /// 是否包含指定部件
    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// 所有部件标签（按字典序）
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// 遍历 (标签, 形状数据路径)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 部件数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 扫描容器文件，建立部件索引
///
/// 扩展名不是容器扩展名时返回空索引而不是错误。
pub fn scan(path: impl AsRef<Path>) -> Result<PartIndex, FileError> {
    let path = path.as_ref();

    if !is_container_path(path) {
        debug!("Not a container file, no parts: {}", path.display());
        return Ok(PartIndex::new());
    }

    let mut container = ContainerArchive::open(path)?;
    let index = container.part_index()?;
    debug!("Scanned {} parts from {}", index.len(), path.display());
    Ok(index)
}

/// 从描述文件流中读取部件索引
pub fn read_index(mut reader: impl BufRead) -> io::Result<PartIndex> {
    let mut entries = BTreeMap::new();

    let mut label_pending = false;
    let mut shape_pending = false;
    let mut label: Option<String> = None;
    let mut part: Option<String> = None;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);

        if line.contains(LABEL_MARKER) {
            label_pending = true;
        } else if line.contains(SHAPE_MARKER) {
            shape_pending = true;
        } else if label_pending && line.contains(LABEL_VALUE) {
            if let Some(value) = quoted_attribute(&line, "value") {
                label = Some(value);
                label_pending = false;
            }
        } else if shape_pending && line.contains(SHAPE_VALUE) {
            if let Some(file) = quoted_attribute(&line, "file") {
                part = Some(file);
                shape_pending = false;
            }
        }

        // TODO: 若确认每个 <Object> 都同时带有 Label 和 Shape，可在遇到 `<Object name=` 时清空捕获，避免错配
        if let (Some(l), Some(p)) = (&label, &part) {
            if !l.is_empty() && !p.is_empty() {
                entries.insert(l.clone(), p.clone());
            }
            label = None;
            part = None;
        }
    }

    Ok(PartIndex { entries })
}

/// 提取 `name="..."` 的值，并解码 XML 实体
fn quoted_attribute(line: &str, name: &str) -> Option<String> {
    let pattern = format!("{}=\"", name);
    let start = line.find(&pattern)? + pattern.len();
    let len = line[start..].find('"')?;
    let raw = &line[start..start + len];

    let value = match quick_xml::escape::unescape(raw) {
        Ok(value) => value,
        Err(_) => Cow::Borrowed(raw),
    };
    Some(value.into_owned())
}
