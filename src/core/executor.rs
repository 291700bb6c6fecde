use crate::core::comparator::SyncAction;
use crate::core::stats::RunStats;
use crate::error::{IoOp, SyncError};
use crate::logging::SyncLog;
use crate::storage::Storage;
use std::io;
use std::path::Path;
use tracing::trace;

/// 文件动作执行器
///
/// 只处理单个文件的复制、更新和删除，不处理目录。
/// 成功后写日志并递增对应计数；失败时返回错误，由调用方记录。
pub struct ActionExecutor<'a, S: Storage> {
    storage: S,
    log: &'a SyncLog,
}

impl<'a, S: Storage> ActionExecutor<'a, S> {
    pub fn new(storage: S, log: &'a SyncLog) -> Self {
        Self { storage, log }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 执行一个动作
    pub fn apply(
        &self,
        action: SyncAction,
        source: Option<&Path>,
        replica: &Path,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        match action {
            SyncAction::Copy | SyncAction::Update => {
                let op = if action == SyncAction::Copy {
                    IoOp::Copy
                } else {
                    IoOp::Update
                };
                let source = source.ok_or_else(|| {
                    SyncError::io(
                        op,
                        replica,
                        io::Error::new(io::ErrorKind::InvalidInput, "no source path"),
                    )
                })?;

                self.storage
                    .copy_file(source, replica)
                    .map_err(|e| SyncError::io(op, replica, e))?;

                if action == SyncAction::Copy {
                    self.log.log(format!("File copied: {}", replica.display()));
                    stats.files_copied += 1;
                } else {
                    self.log.log(format!("File updated: {}", replica.display()));
                    stats.files_updated += 1;
                }
                Ok(())
            }
            SyncAction::Remove => {
                self.storage
                    .remove_file(replica)
                    .map_err(|e| SyncError::io(IoOp::RemoveFile, replica, e))?;
                self.log.log(format!("File removed: {}", replica.display()));
                stats.files_removed += 1;
                Ok(())
            }
            SyncAction::CreateDirectory | SyncAction::None => {
                trace!("无需执行: {} ({})", replica.display(), action);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SyncLog) {
        let dir = TempDir::new().unwrap();
        let log = SyncLog::open(&dir.path().join("sync.log")).unwrap().without_echo();
        (dir, log)
    }

    #[test]
    fn test_copy_counts_and_logs() {
        let (dir, log) = setup();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, b"X").unwrap();

        let executor = ActionExecutor::new(LocalStorage::new(dir.path()), &log);
        let mut stats = RunStats::new();
        executor
            .apply(SyncAction::Copy, Some(&src), &dst, &mut stats)
            .unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"X");
        assert_eq!(stats.files_copied, 1);
        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.contains(&format!("File copied: {}", dst.display())));
    }

    #[test]
    fn test_update_counts_separately() {
        let (dir, log) = setup();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();

        let executor = ActionExecutor::new(LocalStorage::new(dir.path()), &log);
        let mut stats = RunStats::new();
        executor
            .apply(SyncAction::Update, Some(&src), &dst, &mut stats)
            .unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"new");
        assert_eq!(stats.files_updated, 1);
        assert_eq!(stats.files_copied, 0);
    }

    #[test]
    fn test_remove_counts_and_logs() {
        let (dir, log) = setup();
        let dst = dir.path().join("c.txt");
        fs::write(&dst, b"c").unwrap();

        let executor = ActionExecutor::new(LocalStorage::new(dir.path()), &log);
        let mut stats = RunStats::new();
        executor
            .apply(SyncAction::Remove, None, &dst, &mut stats)
            .unwrap();

        assert!(!dst.exists());
        assert_eq!(stats.files_removed, 1);
        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("File removed: "));
    }

    #[test]
    fn test_failure_does_not_count() {
        let (dir, log) = setup();
        let executor = ActionExecutor::new(LocalStorage::new(dir.path()), &log);
        let mut stats = RunStats::new();

        let err = executor
            .apply(
                SyncAction::Copy,
                Some(&dir.path().join("missing")),
                &dir.path().join("out"),
                &mut stats,
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { op: IoOp::Copy, .. }));

        let err = executor
            .apply(SyncAction::Remove, None, &dir.path().join("missing"), &mut stats)
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { op: IoOp::RemoveFile, .. }));

        assert!(stats.is_empty());
    }

    #[test]
    fn test_none_is_noop() {
        let (dir, log) = setup();
        let executor = ActionExecutor::new(LocalStorage::new(dir.path()), &log);
        let mut stats = RunStats::new();
        executor
            .apply(SyncAction::None, None, &dir.path().join("x"), &mut stats)
            .unwrap();
        assert!(stats.is_empty());
    }
}
