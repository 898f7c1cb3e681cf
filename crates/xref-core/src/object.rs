//! 外部引用对象
//!
//! 宿主文档中的对象，暴露 `File`、`Part` 两个属性和解析出的形状。

use crate::error::ReferenceError;
use crate::host::{DocumentOpener, RecomputeScheduler};
use crate::resolver::{ResolveOutcome, Resolver};
use crate::shape::ShapeDecoder;
use crate::target::ReferenceTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;
use xref_file::{FileError, PartIndex};

/// 新建引用对象的默认名称
pub const DEFAULT_LABEL: &str = "External Reference";

/// 引用对象标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceId(pub Uuid);

impl ReferenceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReferenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 对象属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Label,
    File,
    Part,
    TimeStamp,
}

/// 外部引用对象
pub struct ExternalReference<D: ShapeDecoder> {
    id: ReferenceId,
    label: String,
    resolver: Resolver<D>,

    /// 源文件最近一次观察到的修改时间
    timestamp: Option<f64>,

    /// 是否需要宿主重算
    touched: bool,
}

impl<D: ShapeDecoder> ExternalReference<D> {
    /// 创建空引用
    pub fn new(decoder: D) -> Self {
        Self {
            id: ReferenceId::new(),
            label: DEFAULT_LABEL.to_string(),
            resolver: Resolver::new(ReferenceTarget::default(), decoder),
            timestamp: None,
            touched: false,
        }
    }

    pub fn id(&self) -> ReferenceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.on_changed(Property::Label);
    }

    pub fn file(&self) -> &Path {
        self.resolver.target().source_path()
    }

    pub fn part(&self) -> &str {
        self.resolver.target().part_label()
    }

    pub fn set_file(&mut self, file: impl Into<PathBuf>) {
        if self.resolver.set_source_path(file) {
            self.on_changed(Property::File);
        }
    }

    pub fn set_part(&mut self, part: impl Into<String>) {
        if self.resolver.set_part_label(part) {
            self.on_changed(Property::Part);
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Option<f64>) {
        self.timestamp = timestamp;
        self.on_changed(Property::TimeStamp);
    }

    /// 属性变化通知
    pub fn on_changed(&mut self, property: Property) {
        if property == Property::File {
            // 记录的是旧文件的修改时间，换文件后重新观察
            self.timestamp = None;
        }
        if matches!(property, Property::File | Property::Part) {
            self.resolver.mark_dirty();
            self.touch();
        }
    }

    pub fn resolver(&self) -> &Resolver<D> {
        &self.resolver
    }

    pub fn is_dirty(&self) -> bool {
        self.resolver.is_dirty()
    }

    pub fn mark_dirty(&mut self) {
        self.resolver.mark_dirty();
    }

    /// 标记需要重算
    pub fn touch(&mut self) {
        self.touched = true;
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// 解析出的形状
    pub fn shape(&self) -> Option<&D::Shape> {
        self.resolver.shape()
    }

    /// 最近一次扫描的部件索引
    pub fn parts(&self) -> Option<&PartIndex> {
        self.resolver.parts()
    }

    /// 重算入口
    pub fn execute(&mut self) -> ResolveOutcome {
        self.touched = false;
        self.resolver.resolve()
    }

    /// 强制重新加载
    pub fn reload(&mut self, scheduler: &dyn RecomputeScheduler) {
        info!("Reloading external reference '{}'", self.label);
        self.resolver.mark_dirty();
        self.touch();
        scheduler.request_recompute(self.id);
    }

    /// 打开引用的源文件；未设置文件时返回 `Ok(false)`
    pub fn open_source(&self, opener: &dyn DocumentOpener) -> Result<bool, ReferenceError> {
        if !self.resolver.target().has_source() {
            return Ok(false);
        }
        opener
            .open_document(self.file())
            .map_err(FileError::from)?;
        Ok(true)
    }

    /// 导出持久化记录
    pub fn to_record(&self) -> ReferenceRecord {
        ReferenceRecord {
            id: Some(self.id.0),
            label: self.label.clone(),
            file: self.file().to_path_buf(),
            part: self.part().to_string(),
            timestamp: self.timestamp,
        }
    }

    /// 从持久化记录恢复（恢复后总是 Dirty）
    pub fn restore(record: ReferenceRecord, decoder: D) -> Self {
        Self {
            id: record.id.map(ReferenceId).unwrap_or_default(),
            label: record.label,
            resolver: Resolver::new(ReferenceTarget::new(record.file, record.part), decoder),
            timestamp: record.timestamp,
            touched: true,
        }
    }
}

impl<D: ShapeDecoder> std::fmt::Debug for ExternalReference<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalReference")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("resolver", &self.resolver)
            .field("timestamp", &self.timestamp)
            .field("touched", &self.touched)
            .finish()
    }
}

/// 创建外部引用对象
pub fn make_reference<D: ShapeDecoder>(
    decoder: D,
    file: Option<&Path>,
    part: Option<&str>,
    label: &str,
) -> ExternalReference<D> {
    let mut reference = ExternalReference::new(decoder);
    reference.set_label(label);
    if let Some(file) = file {
        reference.set_file(file);
    }
    if let Some(part) = part {
        reference.set_part(part);
    }
    reference
}

/// 引用对象的持久化记录
///
/// 缺失的字段取默认值，旧文件中没有的属性在恢复时自动补上。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceRecord {
    pub id: Option<Uuid>,
    pub label: String,
    pub file: PathBuf,
    pub part: String,
    pub timestamp: Option<f64>,
}

impl Default for ReferenceRecord {
    fn default() -> Self {
        Self {
            id: None,
            label: DEFAULT_LABEL.to_string(),
            file: PathBuf::new(),
            part: String::new(),
            timestamp: None,
        }
    }
}
