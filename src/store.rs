// Task board state container with write-through persistence

use crate::blob::{BlobStore, MAX_KEY_LEN, validate_key};
use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::observer::{SubscriptionId, Subscribers};
use crate::stats::{self, WeeklyStats};
use crate::task::{self, Task, TaskStatus};
use chrono::{DateTime, Local, NaiveDate};
use eyre::{Context, Result, eyre};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Blob key the task list is stored under unless configured otherwise
pub const DEFAULT_KEY: &str = "tasks";

/// Prefix of the warning shown when a write did not reach storage
pub const SAVE_WARNING: &str = "changes may not be saved";

/// Appended to the task list key to name the copy of an unreadable blob
pub const CORRUPT_SUFFIX: &str = "-corrupt";

/// Check that `key` is usable for a task list, backup key included
pub fn validate_board_key(key: &str) -> Result<()> {
    validate_key(key)?;
    let max = MAX_KEY_LEN - CORRUPT_SUFFIX.len();
    if key.len() > max {
        return Err(eyre!("Task list key too long: {} (max {} chars)", key, max));
    }
    Ok(())
}

/// Owns the board's task sequence and keeps storage in step with it
///
/// The in-memory sequence is the source of truth. Every mutating call writes
/// the whole sequence to the blob store and then notifies subscribers exactly
/// once, including calls that turn out to be no-ops. Calls take `&mut self`
/// and finish their write before returning, so writes never interleave.
pub struct TaskStore<B: BlobStore> {
    blob: B,
    key: String,
    clock: Box<dyn Clock>,
    tasks: Vec<Task>,
    subscribers: Subscribers,
    save_error: Option<String>,
}

impl<B: BlobStore> TaskStore<B> {
    /// Create an empty store over `blob`; call [`TaskStore::load`] to read saved tasks
    pub fn new(blob: B) -> Self {
        Self {
            blob,
            key: DEFAULT_KEY.to_string(),
            clock: Box::new(SystemClock),
            tasks: Vec::new(),
            subscribers: Subscribers::new(),
            save_error: None,
        }
    }

    /// Store the task list under a different blob key
    pub fn with_key(mut self, key: &str) -> Result<Self> {
        validate_board_key(key)?;
        self.key = key.to_string();
        Ok(self)
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the in-memory sequence with the persisted one
    ///
    /// A missing blob yields an empty board. A blob that cannot be parsed is
    /// copied aside under `{key}-corrupt`, logged, and treated as empty. A
    /// blob that parses but has entries that had to be left out is copied
    /// aside the same way before the readable tasks are used, since the next
    /// write replaces it. Only a failure to read storage at all is returned as
    /// an error, in which case the store is left untouched.
    pub fn load(&mut self) -> Result<()> {
        let raw = self
            .blob
            .get(&self.key)
            .with_context(|| format!("Failed to read task list '{}'", self.key))?;

        let tasks = match raw {
            None => {
                debug!(key = %self.key, "No saved task list, starting empty");
                Vec::new()
            }
            Some(raw) => match codec::decode_tasks(&raw) {
                Ok(decoded) if decoded.is_complete() => decoded.tasks,
                Ok(decoded) => {
                    warn!(key = %self.key, skipped = decoded.skipped, "Saved task list has unreadable entries");
                    self.stash_corrupt(&raw);
                    decoded.tasks
                }
                Err(e) => {
                    warn!(key = %self.key, error = %format!("{:#}", e), "Saved task list is corrupt, starting empty");
                    self.stash_corrupt(&raw);
                    Vec::new()
                }
            },
        };
        self.tasks = tasks;

        info!(key = %self.key, count = self.tasks.len(), "Loaded tasks");
        self.subscribers.notify(&self.tasks);
        Ok(())
    }

    fn stash_corrupt(&mut self, raw: &str) {
        let backup_key = format!("{}{}", self.key, CORRUPT_SUFFIX);
        if let Err(e) = self.blob.put(&backup_key, raw) {
            warn!(key = %backup_key, error = %format!("{:#}", e), "Failed to keep a copy of the corrupt task list");
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Add a new `todo` task at the front of the board
    ///
    /// Returns the new task's id, or `None` if the title is blank after
    /// trimming, in which case nothing is added.
    pub fn add(&mut self, title: &str) -> Option<String> {
        let id = if title.trim().is_empty() {
            debug!("Ignoring blank task title");
            None
        } else {
            let task = Task::new(title, self.clock.now());
            let id = task.id.clone();
            debug!(id = %id, title = %task.title, "Adding task");
            self.tasks.insert(0, task);
            Some(id)
        };

        self.commit();
        id
    }

    /// Move a task to another column
    ///
    /// Returns false if no task has `id`.
    pub fn update_status(&mut self, id: &str, status: TaskStatus) -> bool {
        let now = self.clock.now();
        let found = match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                debug!(id, from = %task.status, to = %status, "Updating task status");
                task.set_status(status, now);
                true
            }
            None => false,
        };

        self.commit();
        found
    }

    /// Remove a task; returns false if no task has `id`
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let found = self.tasks.len() != before;
        if found {
            debug!(id, "Deleted task");
        }

        self.commit();
        found
    }

    /// Retitle a task; returns false if no task has `id`
    ///
    /// A blank title leaves the current one in place.
    pub fn rename(&mut self, id: &str, title: &str) -> bool {
        let title = title.trim();
        let found = match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                if title.is_empty() {
                    debug!(id, "Ignoring blank rename");
                } else {
                    task.title = title.to_string();
                }
                true
            }
            None => false,
        };

        self.commit();
        found
    }

    fn commit(&mut self) {
        match self.persist() {
            Ok(()) => self.save_error = None,
            Err(e) => {
                warn!(key = %self.key, error = %format!("{:#}", e), "Failed to save tasks");
                self.save_error = Some(format!("{}: {:#}", SAVE_WARNING, e));
            }
        }
        self.subscribers.notify(&self.tasks);
    }

    fn persist(&mut self) -> Result<()> {
        let blob = codec::encode_tasks(&self.tasks)?;
        self.blob.put(&self.key, &blob)?;
        debug!(key = %self.key, count = self.tasks.len(), "Saved tasks");
        Ok(())
    }

    /// Warning for the user if the last write failed
    pub fn save_warning(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Current task sequence, newest first
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks of one board column, in board order
    pub fn column(&self, status: TaskStatus) -> Vec<&Task> {
        task::column(&self.tasks, status)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Find the full id matching `prefix`
    ///
    /// An exact id always wins; otherwise the prefix must match exactly one task.
    pub fn resolve_id(&self, prefix: &str) -> Result<String> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(eyre!("Task id cannot be empty"));
        }
        if let Some(task) = self.get(prefix) {
            return Ok(task.id.clone());
        }

        let matches: Vec<&Task> = self.tasks.iter().filter(|t| t.id.starts_with(prefix)).collect();
        match matches.as_slice() {
            [task] => Ok(task.id.clone()),
            [] => Err(eyre!("No task with id {}", prefix)),
            many => Err(eyre!("Task id {} is ambiguous ({} matches)", prefix, many.len())),
        }
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Call `callback` with the current snapshot after every change
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[Task]) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    fn local_now(&self) -> DateTime<Local> {
        self.clock.now().with_timezone(&Local)
    }

    /// Tasks created from local midnight six days ago through now
    pub fn tasks_in_last_7_days_created(&self) -> Vec<&Task> {
        stats::created_in_window(&self.tasks, &self.local_now())
    }

    /// Tasks completed from local midnight six days ago through now
    pub fn tasks_in_last_7_days_done(&self) -> Vec<&Task> {
        stats::done_in_window(&self.tasks, &self.local_now())
    }

    /// Completions per local calendar day, oldest first, seven entries
    pub fn done_per_day_last_7(&self) -> BTreeMap<NaiveDate, usize> {
        stats::done_per_day(&self.tasks, &self.local_now())
    }

    pub fn weekly_stats(&self) -> WeeklyStats {
        WeeklyStats::compute(&self.tasks, &self.local_now())
    }
}
