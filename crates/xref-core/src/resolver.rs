//! 引用解析器
//!
//! 两个状态：
//! - Dirty：需要重新解析（初始状态；目标改变、显式重新加载或检测到文件变化后）
//! - Clean：最近一次解析反映当前目标
//!
//! 一次解析尝试结束后（无论成功与否）都回到 Clean，
//! 失败不会在每次无关的重算中反复重试，直到再次被标记为 Dirty。
//! 失败时保留之前的形状。

use crate::error::ReferenceError;
use crate::shape::ShapeDecoder;
use crate::target::ReferenceTarget;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use xref_file::{is_container_path, ContainerArchive, PartIndex};

/// 一次 `resolve` 调用的结果
#[derive(Debug)]
pub enum ResolveOutcome {
    /// 已是 Clean，未做任何工作
    Clean,
    /// 文件或部件未设置，未做任何工作（保持 Dirty）
    Incomplete,
    /// 解析成功，形状已更新
    Resolved,
    /// 解析失败，形状保持不变
    Failed(ReferenceError),
}

impl ResolveOutcome {
    /// 本次调用是否执行了解析
    pub fn attempted(&self) -> bool {
        matches!(self, ResolveOutcome::Resolved | ResolveOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&ReferenceError> {
        match self {
            ResolveOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// 引用解析器
pub struct Resolver<D: ShapeDecoder> {
    target: ReferenceTarget,
    decoder: D,
    dirty: bool,
    parts: Option<PartIndex>,
    shape: Option<D::Shape>,
}

impl<D: ShapeDecoder> Resolver<D> {
    /// 创建解析器（初始为 Dirty）
    pub fn new(target: ReferenceTarget, decoder: D) -> Self {
        Self {
            target,
            decoder,
            dirty: true,
            parts: None,
            shape: None,
        }
    }

    pub fn target(&self) -> &ReferenceTarget {
        &self.target
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// 设置源文件；值改变时标记为 Dirty，返回是否改变
    pub fn set_source_path(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if path == self.target.source_path {
            return false;
        }
        self.target.source_path = path;
        self.dirty = true;
        true
    }

    /// 设置部件标签；值改变时标记为 Dirty，返回是否改变
    pub fn set_part_label(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if label == self.target.part_label {
            return false;
        }
        self.target.part_label = label;
        self.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 标记为需要重新解析
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// 最近一次扫描得到的部件索引
    pub fn parts(&self) -> Option<&PartIndex> {
        self.parts.as_ref()
    }

    /// 当前输出形状
    pub fn shape(&self) -> Option<&D::Shape> {
        self.shape.as_ref()
    }

    /// 按需解析
    pub fn resolve(&mut self) -> ResolveOutcome {
        if !self.dirty {
            return ResolveOutcome::Clean;
        }
        if !self.target.is_complete() {
            debug!("Reference incomplete, skipping resolve");
            return ResolveOutcome::Incomplete;
        }

        let outcome = match self.load() {
            Ok(shape) => {
                info!(
                    "Loaded part '{}' from {}",
                    self.target.part_label,
                    self.target.source_path.display()
                );
                self.shape = Some(shape);
                ResolveOutcome::Resolved
            }
            Err(e) => {
                warn!("Failed to resolve external reference: {}", e);
                ResolveOutcome::Failed(e)
            }
        };

        self.dirty = false;
        outcome
    }

    fn load(&mut self) -> Result<D::Shape, ReferenceError> {
        let path = self.target.source_path.clone();
        let label = self.target.part_label.clone();
        self.parts = None;

        // 非容器扩展名视为没有任何部件
        let mut container = if is_container_path(&path) {
            Some(ContainerArchive::open(&path)?)
        } else {
            None
        };
        let index = match container.as_mut() {
            Some(container) => container.part_index()?,
            None => PartIndex::new(),
        };
        let entry = index.get(&label).map(str::to_owned);
        self.parts = Some(index);

        let (Some(entry), Some(container)) = (entry, container.as_mut()) else {
            return Err(ReferenceError::PartNotFound { label, file: path });
        };

        let data = container.read_blob(&entry)?;
        debug!("Read {} bytes from {}:{}", data.len(), path.display(), entry);
        Ok(self.decoder.decode(&data)?)
    }
}

impl<D: ShapeDecoder> std::fmt::Debug for Resolver<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("target", &self.target)
            .field("dirty", &self.dirty)
            .field("parts", &self.parts.as_ref().map(PartIndex::len))
            .field("has_shape", &self.shape.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shape::DecodeError;
    use std::cell::{Cell, RefCell};
    use std::path::Path;
    use std::rc::Rc;
    use xref_file::testing::{ContainerBuilder, SAMPLE_BREP};
    use xref_file::FileError;

    /// 记录每次解码调用的输入
    #[derive(Clone, Default)]
    pub(crate) struct RecordingDecoder {
        pub calls: Rc<RefCell<Vec<Vec<u8>>>>,
        failing: Rc<Cell<bool>>,
    }

    impl ShapeDecoder for RecordingDecoder {
        type Shape = Vec<u8>;

        fn decode(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
            self.calls.borrow_mut().push(data.to_vec());
            if self.failing.get() {
                return Err(DecodeError("unreadable topology".to_string()));
            }
            Ok(data.to_vec())
        }
    }

    impl RecordingDecoder {
        pub fn count(&self) -> usize {
            self.calls.borrow().len()
        }

        /// 之后的解码全部失败
        pub fn set_failing(&self, failing: bool) {
            self.failing.set(failing);
        }
    }

    pub(crate) fn house(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("house.FCStd");
        ContainerBuilder::new()
            .part("Wall001", "Shapes/shape3.brep", b"wall bytes".to_vec())
            .part("Window", "Shapes/shape4.brep", SAMPLE_BREP)
            .indexed_only("Ghost", "Shapes/ghost.brep")
            .write(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_resolve_decodes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = house(dir.path());
        let decoder = RecordingDecoder::default();
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Wall001"), decoder.clone());

        assert!(resolver.is_dirty());
        assert!(matches!(resolver.resolve(), ResolveOutcome::Resolved));
        assert!(!resolver.is_dirty());
        assert_eq!(*decoder.calls.borrow(), vec![b"wall bytes".to_vec()]);
        assert_eq!(resolver.shape(), Some(&b"wall bytes".to_vec()));
        assert_eq!(resolver.parts().map(PartIndex::len), Some(3));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = house(dir.path());
        let decoder = RecordingDecoder::default();
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Wall001"), decoder.clone());

        assert!(resolver.resolve().attempted());
        assert!(matches!(resolver.resolve(), ResolveOutcome::Clean));
        assert_eq!(decoder.count(), 1);
        assert_eq!(resolver.shape(), Some(&b"wall bytes".to_vec()));
    }

    #[test]
    fn test_incomplete_target_stays_dirty() {
        let decoder = RecordingDecoder::default();
        let mut resolver = Resolver::new(ReferenceTarget::new("", "Wall001"), decoder.clone());

        assert!(matches!(resolver.resolve(), ResolveOutcome::Incomplete));
        assert!(resolver.is_dirty());
        assert_eq!(decoder.count(), 0);
    }

    #[test]
    fn test_missing_part_keeps_previous_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = house(dir.path());
        let decoder = RecordingDecoder::default();
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Wall001"), decoder.clone());
        resolver.resolve();

        assert!(resolver.set_part_label("Roof"));
        assert!(resolver.is_dirty());

        let outcome = resolver.resolve();
        assert!(matches!(
            outcome.error(),
            Some(ReferenceError::PartNotFound { label, .. }) if label == "Roof"
        ));
        assert!(!resolver.is_dirty());
        assert_eq!(resolver.shape(), Some(&b"wall bytes".to_vec()));
        assert_eq!(decoder.count(), 1);

        // 失败后不再重试
        assert!(matches!(resolver.resolve(), ResolveOutcome::Clean));
    }

    #[test]
    fn test_blob_missing_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = house(dir.path());
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Ghost"), RecordingDecoder::default());

        let outcome = resolver.resolve();
        assert!(matches!(
            outcome.error(),
            Some(ReferenceError::File(FileError::BlobMissing { .. }))
        ));
        assert!(outcome.error().is_some_and(ReferenceError::is_missing_part));
        assert!(!resolver.is_dirty());
        assert!(resolver.shape().is_none());
    }

    #[test]
    fn test_decode_failure_keeps_previous_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = house(dir.path());
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Wall001"), RecordingDecoder::default());
        assert!(matches!(resolver.resolve(), ResolveOutcome::Resolved));

        resolver.decoder().set_failing(true);
        resolver.mark_dirty();
        let outcome = resolver.resolve();
        assert!(matches!(outcome, ResolveOutcome::Failed(ReferenceError::Decode(_))));
        assert!(!resolver.is_dirty());
        assert_eq!(resolver.shape(), Some(&b"wall bytes".to_vec()));
        assert_eq!(resolver.decoder().count(), 2);
    }

    #[test]
    fn test_corrupt_container_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.FCStd");
        std::fs::write(&path, b"this is not a zip archive").unwrap();
        let decoder = RecordingDecoder::default();
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Wall001"), decoder.clone());

        assert!(matches!(
            resolver.resolve().error(),
            Some(ReferenceError::File(FileError::CorruptArchive { .. }))
        ));
        assert!(!resolver.is_dirty());
        assert!(resolver.shape().is_none());
        assert_eq!(decoder.count(), 0);
    }

    #[test]
    fn test_missing_file_and_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();

        let mut resolver = Resolver::new(
            ReferenceTarget::new(dir.path().join("absent.FCStd"), "Wall001"),
            RecordingDecoder::default(),
        );
        assert!(matches!(
            resolver.resolve().error(),
            Some(ReferenceError::File(FileError::FileNotFound(_)))
        ));
        assert!(resolver.parts().is_none());
        assert!(!resolver.is_dirty());

        let mut resolver = Resolver::new(
            ReferenceTarget::new(dir.path().join("house.step"), "Wall001"),
            RecordingDecoder::default(),
        );
        assert!(matches!(
            resolver.resolve().error(),
            Some(ReferenceError::PartNotFound { .. })
        ));
        assert!(resolver.parts().is_some_and(PartIndex::is_empty));
    }

    #[test]
    fn test_unchanged_setter_keeps_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = house(dir.path());
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Wall001"), RecordingDecoder::default());
        resolver.resolve();

        assert!(!resolver.set_source_path(&path));
        assert!(!resolver.set_part_label("Wall001"));
        assert!(!resolver.is_dirty());

        resolver.mark_dirty();
        assert!(resolver.is_dirty());
    }

    #[test]
    fn test_reload_after_upstream_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = house(dir.path());
        let decoder = RecordingDecoder::default();
        let mut resolver = Resolver::new(ReferenceTarget::new(&path, "Wall001"), decoder.clone());
        resolver.resolve();

        ContainerBuilder::new()
            .part("Wall001", "Shapes/shape9.brep", b"thicker wall".to_vec())
            .write(&path)
            .unwrap();
        resolver.mark_dirty();

        assert!(matches!(resolver.resolve(), ResolveOutcome::Resolved));
        assert_eq!(resolver.shape(), Some(&b"thicker wall".to_vec()));
        assert_eq!(resolver.parts().and_then(|p| p.get("Wall001")), Some("Shapes/shape9.brep"));
    }
}
