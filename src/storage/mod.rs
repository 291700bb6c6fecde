pub mod local;

use std::io;
use std::path::Path;

pub use local::LocalStorage;

/// 副本侧的文件系统操作
///
/// 每个方法只处理一个路径，调用之间互不依赖，
/// 因此任意两次调用之间中断都不会留下损坏的文件。
pub trait Storage: Send + Sync {
    /// 创建目录（包括缺失的父目录）
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// 复制整个文件，同时保留修改时间和权限位，返回复制的字节数
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// 删除单个文件
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// 删除空目录
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}
