// TaskBoard - Two-column task board with write-through persistence and weekly statistics

pub mod blob;
pub mod clock;
pub mod codec;
pub mod config;
pub mod observer;
pub mod render;
pub mod sqlite;
pub mod stats;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Backend, Config};
pub use observer::SubscriptionId;
pub use sqlite::SqliteBlobStore;
pub use stats::WeeklyStats;
pub use store::{DEFAULT_KEY, SAVE_WARNING, TaskStore};
pub use task::{Task, TaskStatus};
