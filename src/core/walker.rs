//! 目录树遍历
//!
//! 同步阶段需要先序遍历源目录（先建目录再处理其中的文件），
//! 清理空目录阶段则需要后序遍历副本目录（子目录先于父目录），
//! 否则父目录在子目录被删除之前就会被判断为“非空”。

use crate::error::{IoOp, SyncError};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 一次遍历访问到的目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedDir {
    /// 相对根目录的路径，根目录本身为空路径
    pub relative_path: PathBuf,
    /// 完整路径
    pub path: PathBuf,
    /// 该目录下直接包含的文件名（不含子目录），按名称排序
    pub files: Vec<OsString>,
}

/// 目录条目（用于重新列目录）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: OsString,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// 目录树遍历器
///
/// 每次调用 [`pre_order`](TreeWalker::pre_order) 或
/// [`post_order_dirs`](TreeWalker::post_order_dirs) 都会从头开始新的遍历。
/// 遍历过程中目录结构被外部修改时尽力而为：出错的条目以 `Err` 返回，遍历继续。
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 先序遍历所有目录（包括根目录），访问时才列出其中的文件
    pub fn pre_order(&self) -> impl Iterator<Item = Result<WalkedDir, SyncError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    Some(self.visit(entry.into_path()))
                }
                Ok(_) => None,
                Err(e) => Some(Err(walk_error(&self.root, e))),
            })
    }

    /// 后序遍历根目录下的所有子目录（不含根目录本身）
    pub fn post_order_dirs(&self) -> impl Iterator<Item = Result<PathBuf, SyncError>> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => Some(Ok(entry.into_path())),
                Ok(_) => None,
                Err(e) => Some(Err(walk_error(&self.root, e))),
            })
    }

    /// 后序遍历整棵树的所有条目（包括根目录本身），不跟随符号链接
    ///
    /// 用于删除整棵子树：每个目录都在其内容之后出现。
    pub fn post_order_entries(&self) -> impl Iterator<Item = Result<ListedEntry, SyncError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .map(move |entry| match entry {
                Ok(entry) => Ok(ListedEntry {
                    name: entry.file_name().to_os_string(),
                    is_dir: entry.file_type().is_dir(),
                    path: entry.into_path(),
                }),
                Err(e) => Err(walk_error(&self.root, e)),
            })
    }

    fn visit(&self, path: PathBuf) -> Result<WalkedDir, SyncError> {
        let relative_path = path
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let files = list_dir(&path)?
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name)
            .collect();

        Ok(WalkedDir {
            relative_path,
            path,
            files,
        })
    }
}

/// 重新列出目录内容，按名称排序
///
/// 指向目录的符号链接视为目录；失效的符号链接视为文件。
pub fn list_dir(path: &Path) -> Result<Vec<ListedEntry>, SyncError> {
    let read_dir = fs::read_dir(path).map_err(|e| SyncError::io(IoOp::List, path, e))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| SyncError::io(IoOp::List, path, e))?;
        let entry_path = entry.path();
        // fs::metadata 会跟随符号链接
        let is_dir = fs::metadata(&entry_path)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(ListedEntry {
            name: entry.file_name(),
            path: entry_path,
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(entries)
}

/// 目录是否为空
pub fn is_empty_dir(path: &Path) -> Result<bool, SyncError> {
    let mut read_dir = fs::read_dir(path).map_err(|e| SyncError::io(IoOp::List, path, e))?;
    Ok(read_dir.next().is_none())
}

fn walk_error(root: &Path, e: walkdir::Error) -> SyncError {
    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    let message = e.to_string();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
    SyncError::io(IoOp::List, path, source)
}
