//! 定时调度 - 每隔固定时间执行一次完整同步，直到收到中断信号
//!
//! 同步在阻塞线程池中执行，调度器等待它完全结束（包括写入汇总日志）
//! 之后才开始计时，因此两次同步不会重叠。

use crate::config::SyncConfig;
use crate::core::{Reconciler, SyncReport};
use crate::logging::SyncLog;
use crate::storage::LocalStorage;
use anyhow::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 同步调度器
pub struct Scheduler {
    config: SyncConfig,
    log: Arc<SyncLog>,
    cancelled: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(config: SyncConfig, log: Arc<SyncLog>) -> Self {
        Self {
            config,
            log,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 运行直到收到 Ctrl+C
    pub async fn run(&self) -> Result<u32> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // 无法监听信号时只能一直运行
                warn!("无法监听中断信号: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// 运行直到 `shutdown` 完成，返回完整执行的同步次数
    ///
    /// 同步进行中收到停止信号时，当前动作完成后停止，已完成的部分保留。
    pub async fn run_until<F>(&self, shutdown: F) -> Result<u32>
    where
        F: Future,
    {
        tokio::pin!(shutdown);
        let mut runs = 0;

        loop {
            let mut task = self.spawn_run();

            let report = tokio::select! {
                joined = &mut task => joined?,
                _ = &mut shutdown => {
                    info!("收到中断信号，等待当前动作完成");
                    self.cancelled.store(true, Ordering::SeqCst);
                    let report = task.await?;
                    if !report.cancelled {
                        runs += 1;
                    }
                    self.stop();
                    return Ok(runs);
                }
            };
            runs += 1;
            debug!(
                "第 {} 次同步完成: {} 个变更, {} 个错误",
                runs,
                report.stats.total_changes(),
                report.failures
            );

            if self.config.once {
                return Ok(runs);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = &mut shutdown => {
                    self.stop();
                    return Ok(runs);
                }
            }
        }
    }

    fn spawn_run(&self) -> tokio::task::JoinHandle<SyncReport> {
        let source = self.config.source.clone();
        let replica = self.config.replica.clone();
        let log = self.log.clone();
        let cancelled = self.cancelled.clone();

        tokio::task::spawn_blocking(move || {
            let storage = LocalStorage::new(&replica);
            Reconciler::new(source, replica, storage, &log)
                .with_cancel_flag(cancelled)
                .run()
        })
    }

    fn stop(&self) {
        self.log.log("Synchronization stopped");
    }
}
