//! 日志模块
//!
//! 两路输出：
//! - [`SyncLog`]：面向使用者的同步记录，带时间戳追加写入日志文件并同时输出到标准输出；
//! - `tracing`：内部诊断信息，输出到标准错误，默认只显示警告。

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// 时间戳格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 同步日志
///
/// 只追加，不修改也不删除已有内容。以显式实例的形式传给同步引擎，
/// 不依赖任何全局状态。
pub struct SyncLog {
    file_path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    echo: bool,
}

impl SyncLog {
    /// 打开（或创建）日志文件，缺失的父目录会被创建
    pub fn open(file_path: &Path) -> io::Result<Self> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            file_path: file_path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
            echo: true,
        })
    }

    /// 关闭标准输出回显（测试用）
    pub fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// 写入一条日志
    ///
    /// 写文件失败不会中断同步，只通过 tracing 报告。
    pub fn log(&self, message: impl AsRef<str>) {
        let line = format_line(Local::now(), message.as_ref());

        {
            let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                tracing::warn!("写入日志文件失败 {}: {}", self.file_path.display(), e);
            }
        }

        if self.echo {
            println!("{}", line);
        }
    }
}

/// 格式化日志行：`YYYY-MM-DD HH:MM:SS - message`
pub fn format_line(time: DateTime<Local>, message: &str) -> String {
    format!("{} - {}", time.format(TIMESTAMP_FORMAT), message)
}

/// 将日志级别名称转换为 tracing Level
pub fn tracing_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::WARN,
    }
}

/// 初始化诊断日志（输出到标准错误）
///
/// 设置了 `RUST_LOG` 时以其为准，否则使用给定级别。
pub fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(tracing_level(level).into()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
