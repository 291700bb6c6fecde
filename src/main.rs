use clap::Parser;
use foldersync_lib::logging::{init_tracing, SyncLog};
use foldersync_lib::{Cli, Scheduler};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    // 参数缺失时 clap 直接打印用法并以非零状态退出
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let log = match SyncLog::open(&config.log_file) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            eprintln!(
                "Invalid configuration: cannot open log file {}: {}",
                config.log_file.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        "同步 {} -> {}, 间隔 {}s",
        config.source.display(),
        config.replica.display(),
        config.interval.as_secs()
    );

    match Scheduler::new(config, log).run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Synchronization failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
