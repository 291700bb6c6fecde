pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod storage;

pub use crate::config::{Cli, SyncConfig};
pub use crate::core::{Reconciler, RunStats, SyncAction, SyncReport};
pub use crate::error::SyncError;
pub use crate::logging::SyncLog;
pub use crate::scheduler::Scheduler;
pub use crate::storage::{LocalStorage, Storage};
