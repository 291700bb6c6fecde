//! 错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 同步过程中的错误
///
/// `Unreadable` 和 `Io` 只影响单个路径，由调用方记录日志后继续；
/// `Config` 只在启动阶段出现，直接导致进程退出。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 文件无法读取，无法计算内容摘要
    #[error("Error reading file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 创建、复制、删除或列目录失败
    #[error("Error {op} {}: {source}", path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 启动参数缺失或无效
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    pub fn io(op: IoOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// 出错的路径（配置错误没有路径）
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Unreadable { path, .. } | Self::Io { path, .. } => Some(path),
            Self::Config(_) => None,
        }
    }
}

/// 失败的文件系统操作，用于拼接日志消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    CreateDir,
    Copy,
    Update,
    RemoveFile,
    RemoveDir,
    List,
}

impl std::fmt::Display for IoOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoOp::CreateDir => write!(f, "creating directory"),
            IoOp::Copy => write!(f, "copying file"),
            IoOp::Update => write!(f, "updating file"),
            IoOp::RemoveFile => write!(f, "removing file"),
            IoOp::RemoveDir => write!(f, "removing directory"),
            IoOp::List => write!(f, "listing"),
        }
    }
}
