//! ZCAD 外部引用界面
//!
//! 基于egui的即时模式GUI。

pub mod commands;
pub mod panel;

pub use commands::{CommandEffect, ReferenceCommand};
pub use panel::{PanelAction, ReferencePanel};
