use crate::core::comparator::{FileComparator, SyncAction};
use crate::core::executor::ActionExecutor;
use crate::core::stats::RunStats;
use crate::core::walker::{is_empty_dir, list_dir, TreeWalker, WalkedDir};
use crate::error::{IoOp, SyncError};
use crate::logging::SyncLog;
use crate::storage::Storage;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// 同步报告
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub stats: RunStats,
    /// 已记录的单路径错误数
    pub failures: u32,
    /// 是否被中断
    pub cancelled: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl SyncReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// 单次运行的可变状态
#[derive(Debug, Default)]
struct RunState {
    stats: RunStats,
    failures: u32,
    cancelled: bool,
}

/// 单向镜像同步引擎
///
/// 每次 [`run`](Reconciler::run) 依次执行四个阶段：
///
/// 1. 先序遍历源目录，在副本中创建缺失的目录；
/// 2. 对目录中的每个文件决定复制、更新或跳过；
/// 3. 重新列出副本目录，删除源中不存在的条目；
/// 4. 后序遍历副本，删除源中没有对应目录的空目录。
///
/// 第 3、4 阶段每次都重新读取文件系统而不是使用缓存的快照，
/// 以免基于过期的目录结构删除文件。
///
/// 单个路径的失败只记录日志，不会中断整次同步。
pub struct Reconciler<'a, S: Storage> {
    source_root: PathBuf,
    replica_root: PathBuf,
    comparator: FileComparator,
    executor: ActionExecutor<'a, S>,
    log: &'a SyncLog,
    cancelled: Arc<AtomicBool>,
}

impl<'a, S: Storage> Reconciler<'a, S> {
    pub fn new(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        storage: S,
        log: &'a SyncLog,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            comparator: FileComparator::new(),
            executor: ActionExecutor::new(storage, log),
            log,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 使用外部的取消标志（由调度器在收到中断信号时设置）
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// 取消同步，当前动作完成后停止
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self, run: &mut RunState) -> bool {
        if !run.cancelled && self.cancelled.load(Ordering::SeqCst) {
            run.cancelled = true;
        }
        run.cancelled
    }

    /// 运行一次完整的同步
    pub fn run(&self) -> SyncReport {
        let started_at = Local::now();
        let mut run = RunState::default();

        info!(
            "开始同步: {} -> {} ({})",
            self.source_root.display(),
            self.replica_root.display(),
            self.executor.storage().name()
        );

        let walker = TreeWalker::new(&self.source_root);
        for dir in walker.pre_order() {
            if self.is_cancelled(&mut run) {
                break;
            }

            let dir = match dir {
                Ok(dir) => dir,
                Err(e) => {
                    self.record_error(e, &mut run);
                    continue;
                }
            };

            let replica_dir = self.replica_path(&dir.relative_path);
            if !self.materialize_dir(&replica_dir, &mut run) {
                continue;
            }
            self.sync_files(&dir, &replica_dir, &mut run);
            self.remove_orphans(&dir.path, &replica_dir, &mut run);
        }

        if !self.is_cancelled(&mut run) {
            self.prune_empty_dirs(&mut run);
        }

        if run.cancelled {
            self.log
                .log("Sync interrupted, replica is partially synchronized");
        }
        self.log.log(run.stats.summary());
        if run.failures > 0 {
            self.log
                .log(format!("Sync completed with {} error(s)", run.failures));
        }

        let report = SyncReport {
            stats: run.stats,
            failures: run.failures,
            cancelled: run.cancelled,
            started_at,
            finished_at: Local::now(),
        };
        debug!(
            "同步结束: {} 个变更, {} 个错误, 耗时 {}ms",
            report.stats.total_changes(),
            report.failures,
            report.duration().num_milliseconds()
        );
        report
    }

    fn replica_path(&self, relative_path: &Path) -> PathBuf {
        if relative_path.as_os_str().is_empty() {
            self.replica_root.clone()
        } else {
            self.replica_root.join(relative_path)
        }
    }

    fn record_error(&self, err: SyncError, run: &mut RunState) {
        debug!("路径失败 {:?}: {:?}", err.path(), err);
        self.log.log(err.to_string());
        run.failures += 1;
    }

    /// 第一阶段：确保副本目录存在，返回是否可以继续处理该目录
    fn materialize_dir(&self, replica_dir: &Path, run: &mut RunState) -> bool {
        // 副本根目录可以是指向目录的符号链接，只有根目录跟随链接
        let meta = if replica_dir == self.replica_root {
            fs::metadata(replica_dir)
        } else {
            fs::symlink_metadata(replica_dir)
        };
        match meta {
            Ok(meta) if meta.is_dir() => return true,
            Ok(_) => {
                // 源中是目录，副本中是文件或符号链接，先删除
                if let Err(e) =
                    self.executor
                        .apply(SyncAction::Remove, None, replica_dir, &mut run.stats)
                {
                    self.record_error(e, run);
                    return false;
                }
            }
            Err(_) => {}
        }

        match self.executor.storage().create_dir(replica_dir) {
            Ok(()) => {
                self.log
                    .log(format!("Directory created: {}", replica_dir.display()));
                run.stats.directories_created += 1;
                true
            }
            Err(e) => {
                self.record_error(SyncError::io(IoOp::CreateDir, replica_dir, e), run);
                false
            }
        }
    }

    /// 第二阶段：复制或更新目录中的文件
    fn sync_files(&self, dir: &WalkedDir, replica_dir: &Path, run: &mut RunState) {
        for name in &dir.files {
            if self.is_cancelled(run) {
                return;
            }

            let source_file = dir.path.join(name);
            let replica_file = replica_dir.join(name);

            if !self.clear_dir_in_place_of_file(&replica_file, run) {
                continue;
            }

            let decision = self.comparator.decide(&source_file, &replica_file);
            if let Some(e) = decision.error {
                self.record_error(e, run);
            }

            if let Err(e) = self.executor.apply(
                decision.action,
                Some(&source_file),
                &replica_file,
                &mut run.stats,
            ) {
                self.record_error(e, run);
            }
        }
    }

    /// 源中是文件，副本中是目录：整棵删除后再复制
    ///
    /// 返回 false 表示目录没有删干净（失败或被取消），跳过这个文件。
    fn clear_dir_in_place_of_file(&self, replica_file: &Path, run: &mut RunState) -> bool {
        let is_real_dir = fs::symlink_metadata(replica_file)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_real_dir {
            return true;
        }

        self.remove_tree(replica_file, run);
        fs::symlink_metadata(replica_file).is_err()
    }

    /// 第三阶段：删除副本目录中源里不存在的条目
    fn remove_orphans(&self, source_dir: &Path, replica_dir: &Path, run: &mut RunState) {
        let entries = match list_dir(replica_dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.record_error(e, run);
                return;
            }
        };

        for entry in entries {
            if self.is_cancelled(run) {
                return;
            }

            let source_path = source_dir.join(&entry.name);
            if fs::symlink_metadata(&source_path).is_ok() {
                continue;
            }

            // 不跟随符号链接，避免删除副本之外的内容
            let is_real_dir = fs::symlink_metadata(&entry.path)
                .map(|m| m.is_dir())
                .unwrap_or(false);

            if is_real_dir {
                self.remove_tree(&entry.path, run);
            } else if let Err(e) =
                self.executor
                    .apply(SyncAction::Remove, None, &entry.path, &mut run.stats)
            {
                self.record_error(e, run);
            }
        }
    }

    /// 逐个删除整棵目录树，子条目先于父目录
    fn remove_tree(&self, root: &Path, run: &mut RunState) {
        for entry in TreeWalker::new(root).post_order_entries() {
            if self.is_cancelled(run) {
                return;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.record_error(e, run);
                    continue;
                }
            };

            if entry.is_dir {
                self.remove_dir(&entry.path, run);
            } else if let Err(e) =
                self.executor
                    .apply(SyncAction::Remove, None, &entry.path, &mut run.stats)
            {
                self.record_error(e, run);
            }
        }
    }

    fn remove_dir(&self, path: &Path, run: &mut RunState) {
        match self.executor.storage().remove_dir(path) {
            Ok(()) => {
                self.log
                    .log(format!("Directory removed: {}", path.display()));
                run.stats.directories_removed += 1;
            }
            Err(e) => self.record_error(SyncError::io(IoOp::RemoveDir, path, e), run),
        }
    }

    /// 第四阶段：后序遍历副本，删除空目录
    ///
    /// 源中存在的空目录属于镜像的一部分，保留。
    fn prune_empty_dirs(&self, run: &mut RunState) {
        let walker = TreeWalker::new(&self.replica_root);
        for dir in walker.post_order_dirs() {
            if self.is_cancelled(run) {
                return;
            }

            let dir = match dir {
                Ok(dir) => dir,
                Err(e) => {
                    self.record_error(e, run);
                    continue;
                }
            };

            let in_source = dir
                .strip_prefix(&self.replica_root)
                .map(|rel| self.source_root.join(rel).is_dir())
                .unwrap_or(false);
            if in_source {
                continue;
            }

            match is_empty_dir(&dir) {
                Ok(true) => self.remove_dir(&dir, run),
                Ok(false) => {}
                Err(e) => self.record_error(e, run),
            }
        }
    }
}
