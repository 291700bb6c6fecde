//! 文件内容摘要 - 用于元数据不一致时确认内容是否真的变化

use crate::error::SyncError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// 每次读取的块大小
pub const CHUNK_SIZE: usize = 4096;

/// 文件内容摘要（BLAKE3，32 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// 计算文件摘要，不报告进度
pub fn digest_file(path: &Path) -> Result<ContentDigest, SyncError> {
    digest_file_with_progress(path, &mut || {})
}

/// 分块流式计算文件摘要
///
/// 每读完一块调用一次 `progress`，回调不携带数据，也不影响结果。
/// 任何读取错误都返回 [`SyncError::Unreadable`]，由调用方决定如何记录。
pub fn digest_file_with_progress(
    path: &Path,
    progress: &mut dyn FnMut(),
) -> Result<ContentDigest, SyncError> {
    let unreadable = |source| SyncError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(unreadable)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(unreadable(e)),
        };
        hasher.update(&buf[..n]);
        progress();
    }

    Ok(ContentDigest(*hasher.finalize().as_bytes()))
}
