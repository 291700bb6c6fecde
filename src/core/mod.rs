pub mod comparator;
pub mod engine;
pub mod executor;
pub mod fingerprint;
pub mod stats;
pub mod walker;

pub use comparator::{Decision, FileComparator, FileMetadata, SyncAction};
pub use engine::{Reconciler, SyncReport};
pub use executor::ActionExecutor;
pub use fingerprint::{digest_file, digest_file_with_progress, ContentDigest, CHUNK_SIZE};
pub use stats::RunStats;
pub use walker::{list_dir, ListedEntry, TreeWalker, WalkedDir};
