use serde::Serialize;

/// 单次同步的统计
///
/// 每次运行创建一个，只在操作成功后递增，运行结束时写入一行汇总日志。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub directories_created: u32,
    pub files_copied: u32,
    pub files_updated: u32,
    pub files_removed: u32,
    pub directories_removed: u32,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否没有任何变更
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn total_changes(&self) -> u32 {
        self.directories_created
            + self.files_copied
            + self.files_updated
            + self.files_removed
            + self.directories_removed
    }

    /// 汇总日志消息
    pub fn summary(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        format!("Sync stats: {}", json)
    }
}
