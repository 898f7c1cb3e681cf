//! 源文件变更检测
//!
//! 按固定间隔读取源文件的修改时间，与引用对象上记录的时间比较：
//! - 之前有记录且不同：标记重新加载并请求重算
//! - 总是把当前时间记为最新值，所以一次变化只触发一次重新加载
//!
//! 检测器只持有引用对象的弱引用；对象被删除后检测器自行停止，不可恢复。
//! 所有操作都在单线程的 `LocalSet` 中执行，不需要加锁。

use crate::host::RecomputeScheduler;
use crate::object::ExternalReference;
use crate::preferences::Preferences;
use crate::shape::ShapeDecoder;
use std::cell::RefCell;
use std::path::Path;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use xref_file::FileError;

/// 读取文件修改时间
pub trait ModificationClock {
    fn modified(&self, path: &Path) -> Result<f64, FileError>;
}

/// 文件系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct FsClock;

impl ModificationClock for FsClock {
    fn modified(&self, path: &Path) -> Result<f64, FileError> {
        xref_file::modified_time(path)
    }
}

/// 一次检查的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 修改时间未变（或首次记录）
    Unchanged,
    /// 修改时间变化，已标记重新加载
    Changed,
    /// 引用对象未设置文件
    NoFile,
    /// 无法读取修改时间，保留原记录，继续检查
    Unavailable,
    /// 引用对象已不存在，检测器应停止
    Detached,
}

/// 源文件变更检测器
pub struct ChangeDetector<D: ShapeDecoder> {
    target: Weak<RefCell<ExternalReference<D>>>,
    interval: Duration,
    clock: Box<dyn ModificationClock>,
    scheduler: Rc<dyn RecomputeScheduler>,
}

impl<D: ShapeDecoder> ChangeDetector<D> {
    /// 挂接到引用对象；检查间隔只在此时读取一次
    pub fn attach(
        reference: &Rc<RefCell<ExternalReference<D>>>,
        preferences: &Preferences,
        scheduler: Rc<dyn RecomputeScheduler>,
    ) -> Self {
        Self {
            target: Rc::downgrade(reference),
            interval: preferences.check_interval(),
            clock: Box::new(FsClock),
            scheduler,
        }
    }

    /// 使用指定的时钟
    pub fn with_clock(mut self, clock: impl ModificationClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 执行一次检查
    pub fn tick(&mut self) -> PollOutcome {
        let Some(reference) = self.target.upgrade() else {
            return PollOutcome::Detached;
        };

        let id = {
            let mut reference = reference.borrow_mut();
            if !reference.resolver().target().has_source() {
                return PollOutcome::NoFile;
            }

            let current = match self.clock.modified(reference.file()) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Cannot check '{}' for changes: {}", reference.label(), e);
                    return PollOutcome::Unavailable;
                }
            };

            // 记录为 0 视为从未观察过
            let changed = reference
                .timestamp()
                .is_some_and(|last| last != 0.0 && last != current);
            reference.set_timestamp(Some(current));

            if !changed {
                return PollOutcome::Unchanged;
            }

            info!(
                "Source of '{}' changed: {}",
                reference.label(),
                reference.file().display()
            );
            reference.mark_dirty();
            reference.touch();
            reference.id()
        };

        // 释放借用后再通知宿主，宿主可能立即重算
        self.scheduler.request_recompute(id);
        PollOutcome::Changed
    }

    /// 定时检查，直到引用对象不存在
    ///
    /// 第一次检查在挂接后一个间隔进行。需要在 `LocalSet` 中运行。
    pub async fn run(mut self) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.tick() {
                PollOutcome::Detached => {
                    info!("External reference removed, change detector stopped");
                    break;
                }
                outcome => debug!("Change check: {:?}", outcome),
            }
        }
    }
}
