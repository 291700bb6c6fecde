//! 启动配置

use crate::error::SyncError;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 命令行参数
#[derive(Debug, Clone, Parser)]
#[command(name = "foldersync")]
#[command(version)]
#[command(about = "One-way folder mirroring: keeps a replica identical to a source folder")]
pub struct Cli {
    /// Source folder path
    #[arg(long, value_name = "PATH")]
    pub source: PathBuf,

    /// Replica folder path
    #[arg(long, value_name = "PATH")]
    pub replica: PathBuf,

    /// Synchronization interval in seconds
    #[arg(long, value_name = "SECONDS")]
    pub interval: u64,

    /// Log file path
    #[arg(long = "log", value_name = "PATH")]
    pub log_file: PathBuf,

    /// Diagnostic log level written to stderr (RUST_LOG overrides it)
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    /// Run a single synchronization and exit
    #[arg(long)]
    pub once: bool,
}

/// 校验后的同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval: Duration,
    pub log_file: PathBuf,
    pub log_level: String,
    pub once: bool,
}

impl Cli {
    /// 校验参数，任何错误都应在开始同步之前终止进程
    pub fn into_config(self) -> Result<SyncConfig, SyncError> {
        if self.interval == 0 {
            return Err(SyncError::Config(
                "interval must be a positive number of seconds".to_string(),
            ));
        }

        if !self.source.is_dir() {
            // 源目录不存在时继续同步会清空副本
            return Err(SyncError::Config(format!(
                "source folder {} does not exist or is not a directory",
                self.source.display()
            )));
        }

        if self.replica.exists() && !self.replica.is_dir() {
            return Err(SyncError::Config(format!(
                "replica {} exists and is not a directory",
                self.replica.display()
            )));
        }

        let source = absolute(&self.source);
        let replica = absolute(&self.replica);
        if source.starts_with(&replica) || replica.starts_with(&source) {
            return Err(SyncError::Config(format!(
                "source {} and replica {} must not contain one another",
                self.source.display(),
                self.replica.display()
            )));
        }

        // 日志文件放在副本里会在下一轮被当作多余文件删除
        if absolute(&self.log_file).starts_with(&replica) {
            return Err(SyncError::Config(format!(
                "log file {} must not be inside the replica folder",
                self.log_file.display()
            )));
        }

        Ok(SyncConfig {
            source: self.source,
            replica: self.replica,
            interval: Duration::from_secs(self.interval),
            log_file: self.log_file,
            log_level: self.log_level,
            once: self.once,
        })
    }
}

/// 尽量得到规范化的绝对路径
///
/// 路径不存在时，规范化最近的已存在祖先目录，再拼接剩余部分。
fn absolute(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = joined.as_path();
    let mut rest = Vec::new();
    while let Some(parent) = existing.parent() {
        if let Some(name) = existing.file_name() {
            rest.push(name.to_os_string());
        }
        existing = parent;
        if let Ok(mut p) = existing.canonicalize() {
            for name in rest.iter().rev() {
                p.push(name);
            }
            return p;
        }
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("foldersync").chain(args.iter().copied()))
    }

    fn args_for(dir: &TempDir) -> (String, String, String) {
        let source = dir.path().join("source");
        std::fs::create_dir(&source).unwrap();
        (
            source.display().to_string(),
            dir.path().join("replica").display().to_string(),
            dir.path().join("sync.log").display().to_string(),
        )
    }

    #[test]
    fn test_all_arguments_required() {
        let err = parse(&["--source", "a", "--replica", "b", "--interval", "5"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = parse(&[]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_interval_must_be_integer() {
        let err = parse(&[
            "--source", "a", "--replica", "b", "--interval", "soon", "--log", "l",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_valid_config() {
        let dir = TempDir::new().unwrap();
        let (source, replica, log) = args_for(&dir);

        let config = parse(&[
            "--source", &source, "--replica", &replica, "--interval", "30", "--log", &log,
        ])
        .unwrap()
        .into_config()
        .unwrap();

        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.log_level, "warn");
        assert!(!config.once);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let (source, replica, log) = args_for(&dir);

        let err = parse(&[
            "--source", &source, "--replica", &replica, "--interval", "0", "--log", &log,
        ])
        .unwrap()
        .into_config()
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_missing_source_rejected() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope").display().to_string();
        let replica = dir.path().join("replica").display().to_string();

        let err = parse(&[
            "--source", &missing, "--replica", &replica, "--interval", "1", "--log", "x.log",
        ])
        .unwrap()
        .into_config()
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_nested_replica_rejected() {
        let dir = TempDir::new().unwrap();
        let (source, _, log) = args_for(&dir);
        let nested = dir.path().join("source/inner").display().to_string();

        let err = parse(&[
            "--source", &source, "--replica", &nested, "--interval", "1", "--log", &log,
        ])
        .unwrap()
        .into_config()
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_log_inside_replica_rejected() {
        let dir = TempDir::new().unwrap();
        let (source, replica, _) = args_for(&dir);
        let log = dir.path().join("replica/sync.log").display().to_string();

        let err = parse(&[
            "--source", &source, "--replica", &replica, "--interval", "1", "--log", &log,
        ])
        .unwrap()
        .into_config()
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_absolute_of_missing_path_uses_existing_ancestor() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("a/b");
        let expected = dir.path().canonicalize().unwrap().join("a/b");
        assert_eq!(absolute(&missing), expected);
    }
}
