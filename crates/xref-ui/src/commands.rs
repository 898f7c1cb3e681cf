//! 外部引用命令
//!
//! 包括创建命令（菜单/工具栏）和对象右键菜单中的命令。

use crate::panel::ReferencePanel;
use tracing::info;
use xref_core::host::{DocumentOpener, RecomputeScheduler};
use xref_core::object::{make_reference, ExternalReference, DEFAULT_LABEL};
use xref_core::shape::ShapeDecoder;
use xref_core::ReferenceError;

/// 外部引用命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceCommand {
    /// 编辑引用（打开面板）
    Edit,
    /// 重新加载引用
    Reload,
    /// 打开引用的源文件
    Open,
}

/// 命令执行结果
#[derive(Debug)]
pub enum CommandEffect {
    /// 已完成
    Done,
    /// 显示编辑面板
    ShowPanel(ReferencePanel),
    /// 条件不满足，未执行
    Skipped,
}

impl ReferenceCommand {
    /// 右键菜单中的命令
    pub const CONTEXT_MENU: [ReferenceCommand; 2] = [ReferenceCommand::Reload, ReferenceCommand::Open];

    pub fn label(&self) -> &'static str {
        match self {
            ReferenceCommand::Edit => "Edit reference",
            ReferenceCommand::Reload => "Reload reference",
            ReferenceCommand::Open => "Open reference",
        }
    }

    /// 执行命令
    pub fn run<D, H>(
        &self,
        reference: &mut ExternalReference<D>,
        host: &H,
    ) -> Result<CommandEffect, ReferenceError>
    where
        D: ShapeDecoder,
        H: RecomputeScheduler + DocumentOpener,
    {
        match self {
            ReferenceCommand::Edit => Ok(CommandEffect::ShowPanel(ReferencePanel::open(reference))),
            ReferenceCommand::Reload => {
                reference.reload(host);
                Ok(CommandEffect::Done)
            }
            ReferenceCommand::Open => {
                if reference.open_source(host)? {
                    info!("Opened reference source {}", reference.file().display());
                    Ok(CommandEffect::Done)
                } else {
                    Ok(CommandEffect::Skipped)
                }
            }
        }
    }
}

/// 创建命令的菜单文本
pub const CREATE_MENU_TEXT: &str = "External reference";
/// 创建命令的快捷键
pub const CREATE_SHORTCUT: &str = "E, X";
/// 创建命令的提示
pub const CREATE_TOOLTIP: &str = "Creates an external reference object";

/// 创建空的外部引用对象，并打开编辑面板
pub fn create_reference<D: ShapeDecoder>(decoder: D) -> (ExternalReference<D>, ReferencePanel) {
    let reference = make_reference(decoder, None, None, DEFAULT_LABEL);
    let panel = ReferencePanel::open(&reference);
    (reference, panel)
}

/// 渲染右键菜单，返回被点击的命令
pub fn show_context_menu(ui: &mut egui::Ui) -> Option<ReferenceCommand> {
    let mut clicked = None;
    for command in ReferenceCommand::CONTEXT_MENU {
        if ui.button(command.label()).clicked() {
            clicked = Some(command);
        }
    }
    clicked
}
