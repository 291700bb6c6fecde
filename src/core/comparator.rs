use crate::core::fingerprint::digest_file;
use crate::error::{IoOp, SyncError};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, trace};

/// 同步动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// 在副本中创建缺失的目录
    CreateDirectory,
    /// 副本中不存在，复制
    Copy,
    /// 副本存在但内容不同，覆盖
    Update,
    /// 源中不存在，从副本删除
    Remove,
    /// 无需操作
    None,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::CreateDirectory => write!(f, "create_directory"),
            SyncAction::Copy => write!(f, "copy"),
            SyncAction::Update => write!(f, "update"),
            SyncAction::Remove => write!(f, "remove"),
            SyncAction::None => write!(f, "none"),
        }
    }
}

/// 文件元数据（用于快速预筛）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_time: SystemTime,
}

impl FileMetadata {
    /// 读取元数据，文件不存在时返回 `Ok(None)`
    pub fn read(path: &Path) -> std::io::Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(Self {
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified_time: metadata.modified()?,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 大小和修改时间是否都一致
    pub fn matches(&self, other: &FileMetadata) -> bool {
        self.size == other.size && self.modified_time == other.modified_time
    }
}

/// 单个文件的比较结果
#[derive(Debug)]
pub struct Decision {
    pub action: SyncAction,
    /// 是否计算过内容摘要
    pub compared_content: bool,
    /// 读取失败的文件（需要记录日志）
    pub error: Option<SyncError>,
}

impl Decision {
    fn new(action: SyncAction) -> Self {
        Self {
            action,
            compared_content: false,
            error: None,
        }
    }
}

/// 文件比较器
///
/// 两级判断：先比较大小和修改时间，只有不一致时才计算内容摘要。
/// 这是启发式判断：大小和修改时间都相同但内容不同的文件会被认为没有变化，
/// 不会被更新。
///
/// 任一侧无法读取时不做更新，只报告错误，避免基于不完整信息覆盖副本。
#[derive(Debug, Clone, Default)]
pub struct FileComparator;

impl FileComparator {
    pub fn new() -> Self {
        Self
    }

    /// 决定源文件对应副本文件需要的动作
    pub fn decide(&self, source: &Path, replica: &Path) -> Decision {
        let replica_meta = match FileMetadata::read(replica) {
            Ok(Some(meta)) => meta,
            Ok(None) => return Decision::new(SyncAction::Copy),
            Err(e) => {
                return Decision {
                    error: Some(SyncError::io(IoOp::List, replica, e)),
                    ..Decision::new(SyncAction::None)
                }
            }
        };

        let source_meta = match FileMetadata::read(source) {
            Ok(Some(meta)) => meta,
            Ok(None) => {
                // 遍历之后源文件被删除，下一轮会在副本中删除它
                debug!("源文件已消失: {}", source.display());
                return Decision::new(SyncAction::None);
            }
            Err(e) => {
                return Decision {
                    error: Some(SyncError::Unreadable {
                        path: source.to_path_buf(),
                        source: e,
                    }),
                    ..Decision::new(SyncAction::None)
                }
            }
        };

        if source_meta.matches(&replica_meta) {
            trace!("元数据一致，跳过: {}", source.display());
            return Decision::new(SyncAction::None);
        }

        debug!(
            "元数据不同，比较内容: {} (src_size={}, dst_size={})",
            source.display(),
            source_meta.size,
            replica_meta.size
        );

        // 源文件读取失败时不再读取副本
        let source_digest = match digest_file(source) {
            Ok(d) => d,
            Err(e) => {
                return Decision {
                    action: SyncAction::None,
                    compared_content: true,
                    error: Some(e),
                }
            }
        };
        let replica_digest = match digest_file(replica) {
            Ok(d) => d,
            Err(e) => {
                return Decision {
                    action: SyncAction::None,
                    compared_content: true,
                    error: Some(e),
                }
            }
        };

        let action = if source_digest != replica_digest {
            SyncAction::Update
        } else {
            SyncAction::None
        };

        Decision {
            action,
            compared_content: true,
            error: None,
        }
    }
}
