//! 外部引用编辑面板
//!
//! 选择源文件和要使用的部件。面板只持有编辑中的值，
//! 确认（`accept`）时才写回引用对象。

use std::path::{Path, PathBuf};
use tracing::warn;
use xref_core::object::ExternalReference;
use xref_core::shape::ShapeDecoder;
use xref_file::{FileError, PartIndex};

/// 面板上的用户操作（需要宿主处理的部分）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    None,
    /// 弹出文件选择对话框，从该目录开始（None 为用户主目录）
    ChooseFile { start_dir: Option<PathBuf> },
    /// 打开当前引用的源文件
    OpenFile,
}

/// 编辑面板状态
#[derive(Debug, Clone)]
pub struct ReferencePanel {
    /// 对象当前的文件
    current_file: PathBuf,
    /// 新选择的文件
    chosen_file: Option<PathBuf>,
    parts: Vec<String>,
    selected: Option<usize>,
    can_open: bool,
}

impl ReferencePanel {
    /// 为引用对象打开面板
    ///
    /// 部件列表优先使用最近一次解析的索引，没有时扫描当前文件。
    pub fn open<D: ShapeDecoder>(reference: &ExternalReference<D>) -> Self {
        let parts = match reference.parts() {
            Some(index) => labels(index),
            None => match xref_file::scan(reference.file()) {
                Ok(index) => labels(&index),
                Err(e) => {
                    warn!("Cannot list parts of {}: {}", reference.file().display(), e);
                    Vec::new()
                }
            },
        };

        let mut panel = Self {
            current_file: reference.file().to_path_buf(),
            chosen_file: None,
            parts,
            selected: None,
            can_open: !reference.file().as_os_str().is_empty(),
        };
        panel.preselect(reference.part());
        panel
    }

    /// 选中指定部件；不存在时选第一个
    fn preselect(&mut self, part: &str) {
        self.selected = self
            .parts
            .iter()
            .position(|p| p == part)
            .or(if self.parts.is_empty() { None } else { Some(0) });
    }

    /// 选择了新文件：重新扫描并刷新部件列表
    ///
    /// 新文件没有任何部件时保留原列表。返回扫描到的部件数量。
    pub fn choose_file(&mut self, path: impl Into<PathBuf>, current_part: &str) -> Result<usize, FileError> {
        let path = path.into();
        let index = xref_file::scan(&path);
        self.chosen_file = Some(path);

        let index = index?;
        if !index.is_empty() {
            self.parts = labels(&index);
            self.preselect(current_part);
        }
        Ok(index.len())
    }

    /// 文件按钮上显示的文本
    pub fn file_button_text(&self) -> String {
        let file = self.chosen_file.as_deref().unwrap_or(&self.current_file);
        match file.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => "Choose file...".to_string(),
        }
    }

    /// 文件选择对话框的起始目录
    pub fn start_dir(&self) -> Option<PathBuf> {
        self.current_file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn selected_part(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.parts.get(i))
            .map(String::as_str)
    }

    /// 选中部件，返回是否存在
    pub fn select(&mut self, part: &str) -> bool {
        match self.parts.iter().position(|p| p == part) {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => false,
        }
    }

    /// 对象是否已有源文件可以打开
    pub fn can_open(&self) -> bool {
        self.can_open
    }

    /// 确认：写回变化的文件和部件，返回是否需要重算
    pub fn accept<D: ShapeDecoder>(&self, reference: &mut ExternalReference<D>) -> bool {
        let mut changed = false;

        if let Some(file) = &self.chosen_file {
            if file.as_path() != reference.file() {
                reference.set_file(file);
                changed = true;
            }
        }

        if let Some(part) = self.selected_part() {
            if part != reference.part() {
                reference.set_part(part);
                changed = true;
            }
        }

        changed
    }

    /// 渲染面板
    pub fn show(&mut self, ui: &mut egui::Ui) -> PanelAction {
        let mut action = PanelAction::None;

        ui.heading("External reference");
        ui.separator();

        ui.label("External file:");
        ui.horizontal(|ui| {
            if ui.button(self.file_button_text()).clicked() {
                action = PanelAction::ChooseFile {
                    start_dir: self.start_dir(),
                };
            }
            if ui
                .add_enabled(self.can_open, egui::Button::new("Open"))
                .clicked()
            {
                action = PanelAction::OpenFile;
            }
        });

        ui.label("Part to use:");
        let selected_text = self.selected_part().unwrap_or_default().to_string();
        egui::ComboBox::from_id_salt("reference_part")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for (i, part) in self.parts.iter().enumerate() {
                    ui.selectable_value(&mut self.selected, Some(i), part.as_str());
                }
            });

        action
    }
}

fn labels(index: &PartIndex) -> Vec<String> {
    index.labels().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xref_core::object::{make_reference, DEFAULT_LABEL};
    use xref_core::shape::BrepDecoder;
    use xref_file::testing::{ContainerBuilder, SAMPLE_BREP};

    fn container(dir: &Path, name: &str, labels: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut builder = ContainerBuilder::new();
        for (i, label) in labels.iter().enumerate() {
            builder = builder.part(label, &format!("PartShape{}.brp", i), SAMPLE_BREP);
        }
        builder.write(&path).unwrap();
        path
    }

    #[test]
    fn test_open_scans_when_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = container(dir.path(), "house.FCStd", &["Wall001", "Door"]);
        let reference = make_reference(BrepDecoder, Some(path.as_path()), Some("Wall001"), DEFAULT_LABEL);

        let panel = ReferencePanel::open(&reference);
        assert_eq!(panel.parts(), ["Door", "Wall001"]);
        assert_eq!(panel.selected_part(), Some("Wall001"));
        assert!(panel.can_open());
        assert_eq!(panel.file_button_text(), "house.FCStd");
        assert_eq!(panel.start_dir(), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_open_uses_cached_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = container(dir.path(), "house.FCStd", &["Wall001"]);
        let mut reference = make_reference(BrepDecoder, Some(path.as_path()), Some("Wall001"), DEFAULT_LABEL);
        reference.execute();

        // 文件已删除，仍能从缓存的索引列出部件
        std::fs::remove_file(&path).unwrap();
        let panel = ReferencePanel::open(&reference);
        assert_eq!(panel.parts(), ["Wall001"]);
    }

    #[test]
    fn test_empty_reference() {
        let reference = xref_core::object::ExternalReference::new(BrepDecoder);
        let panel = ReferencePanel::open(&reference);

        assert!(panel.parts().is_empty());
        assert_eq!(panel.selected_part(), None);
        assert!(!panel.can_open());
        assert_eq!(panel.file_button_text(), "Choose file...");
        assert_eq!(panel.start_dir(), None);
    }

    #[test]
    fn test_choose_file_and_accept() {
        let dir = tempfile::tempdir().unwrap();
        let first = container(dir.path(), "house.FCStd", &["Wall001"]);
        let second = container(dir.path(), "annex.FCStd", &["Slab", "Wall001", "Roof"]);
        let mut reference = make_reference(BrepDecoder, Some(first.as_path()), Some("Wall001"), DEFAULT_LABEL);
        reference.execute();

        let mut panel = ReferencePanel::open(&reference);
        assert_eq!(panel.choose_file(&second, reference.part()).unwrap(), 3);
        assert_eq!(panel.parts(), ["Roof", "Slab", "Wall001"]);
        assert_eq!(panel.selected_part(), Some("Wall001"));
        assert_eq!(panel.file_button_text(), "annex.FCStd");

        assert!(panel.select("Roof"));
        assert!(!panel.select("Chimney"));

        assert!(panel.accept(&mut reference));
        assert_eq!(reference.file(), second.as_path());
        assert_eq!(reference.part(), "Roof");
        assert!(reference.is_dirty());

        // 再次确认没有变化
        reference.execute();
        assert!(!panel.accept(&mut reference));
        assert!(!reference.is_dirty());
    }

    #[test]
    fn test_choose_file_without_parts_keeps_list() {
        let dir = tempfile::tempdir().unwrap();
        let first = container(dir.path(), "house.FCStd", &["Wall001"]);
        let reference = make_reference(BrepDecoder, Some(first.as_path()), Some("Wall001"), DEFAULT_LABEL);

        let mut panel = ReferencePanel::open(&reference);
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "hello").unwrap();

        assert_eq!(panel.choose_file(&notes, "Wall001").unwrap(), 0);
        assert_eq!(panel.parts(), ["Wall001"]);
        assert_eq!(panel.file_button_text(), "notes.txt");

        let missing = dir.path().join("missing.FCStd");
        assert!(panel.choose_file(&missing, "Wall001").is_err());
        assert_eq!(panel.parts(), ["Wall001"]);
    }

    #[test]
    fn test_missing_part_selects_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = container(dir.path(), "house.FCStd", &["Door", "Wall001"]);
        let reference = make_reference(BrepDecoder, Some(path.as_path()), Some("Chimney"), DEFAULT_LABEL);

        let panel = ReferencePanel::open(&reference);
        assert_eq!(panel.selected_part(), Some("Door"));
    }
}
