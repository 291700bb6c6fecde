use super::Storage;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// 本地文件系统存储
#[derive(Debug, Clone)]
pub struct LocalStorage {
    name: String,
}

impl LocalStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            name: format!("local:{}", root.display()),
        }
    }

    /// 先写入同目录下的临时文件再 rename，保证替换是原子的
    ///
    /// 临时文件名固定长度且随机，不受目标文件名长度影响，
    /// 也不会和副本中的真实文件重名。失败时临时文件随 drop 删除。
    fn copy_via_temp(from: &Path, to: &Path) -> io::Result<u64> {
        let metadata = fs::metadata(from)?;
        let parent = match to.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let temp = NamedTempFile::new_in(parent)?;
        // fs::copy 会同时复制权限位
        let bytes = fs::copy(from, temp.path())?;

        let atime = FileTime::from_last_access_time(&metadata);
        let mtime = FileTime::from_last_modification_time(&metadata);
        filetime::set_file_times(temp.path(), atime, mtime)?;

        temp.persist(to).map_err(|e| e.error)?;
        Ok(bytes)
    }
}

impl Storage for LocalStorage {
    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        debug!("复制: {} -> {}", from.display(), to.display());
        Self::copy_via_temp(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_copy_preserves_content_and_mtime() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.txt");
        let to = dir.path().join("b.txt");
        fs::write(&from, b"hello").unwrap();
        filetime::set_file_mtime(&from, FileTime::from_unix_time(1_500_000_000, 123)).unwrap();

        let storage = LocalStorage::new(dir.path());
        assert_eq!(storage.copy_file(&from, &to).unwrap(), 5);

        assert_eq!(fs::read(&to).unwrap(), b"hello");
        let src_meta = fs::metadata(&from).unwrap();
        let dst_meta = fs::metadata(&to).unwrap();
        assert_eq!(src_meta.modified().unwrap(), dst_meta.modified().unwrap());
        assert_eq!(entry_names(dir.path()), vec!["a.txt", "b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let from = dir.path().join("script.sh");
        let to = dir.path().join("copy.sh");
        fs::write(&from, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&from, fs::Permissions::from_mode(0o750)).unwrap();

        LocalStorage::new(dir.path()).copy_file(&from, &to).unwrap();

        let mode = fs::metadata(&to).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[test]
    fn test_copy_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.txt");
        let to = dir.path().join("b.txt");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old content").unwrap();

        LocalStorage::new(dir.path()).copy_file(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"new");
    }

    #[test]
    fn test_failed_copy_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let to = dir.path().join("b.txt");

        let err = LocalStorage::new(dir.path())
            .copy_file(&dir.path().join("missing"), &to)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!to.exists());
        assert!(entry_names(dir.path()).is_empty());
    }

    #[test]
    fn test_failed_rename_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.txt");
        fs::write(&from, b"x").unwrap();
        // 目标是非空目录，rename 失败
        let to = dir.path().join("busy");
        fs::create_dir(&to).unwrap();
        fs::write(to.join("inner"), b"1").unwrap();

        assert!(LocalStorage::new(dir.path()).copy_file(&from, &to).is_err());
        assert_eq!(entry_names(dir.path()), vec!["a.txt", "busy"]);
    }

    #[test]
    fn test_copy_file_with_longest_name() {
        let dir = TempDir::new().unwrap();
        let src_dir = dir.path().join("src");
        let dst_dir = dir.path().join("dst");
        fs::create_dir(&src_dir).unwrap();
        fs::create_dir(&dst_dir).unwrap();

        // 大多数文件系统允许的最长文件名
        let name = "a".repeat(255);
        fs::write(src_dir.join(&name), b"long").unwrap();

        let to = dst_dir.join(&name);
        LocalStorage::new(&dst_dir)
            .copy_file(&src_dir.join(&name), &to)
            .unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"long");
        assert_eq!(entry_names(&dst_dir), vec![name]);
    }

    #[test]
    fn test_create_and_remove_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let nested = dir.path().join("x/y");

        storage.create_dir(&nested).unwrap();
        assert!(nested.is_dir());

        storage.remove_dir(&nested).unwrap();
        assert!(!nested.exists());
        // 非空目录不能删除
        fs::write(dir.path().join("x/f"), b"1").unwrap();
        assert!(storage.remove_dir(&dir.path().join("x")).is_err());
    }
}
