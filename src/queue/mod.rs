/*!
File-backed notification queue.

The queue is a single JSON document (see `document.rs`) shared by two
processes: the checker appends, the delivery worker removes from the front.
Every mutation is a locked read-modify-write:

1. take the exclusive lock on `<queue>.lock` (`lock.rs`), with bounded retry
2. read and parse the whole document
3. modify it in memory (a batch append adds all of its entries here)
4. write it to a temp file in the same directory and rename it into place
5. release the lock

File states:
- absent, zero bytes, or whitespace only -> empty queue
- valid document -> its entries, in order
- anything else -> `QueueError::Corrupt`; the file is left untouched

Reads that find nothing to change never write, so draining an absent queue
does not create it.
*/

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

pub mod document;
pub mod lock;

pub use document::{QueueDocument, QueueEntry};
pub use lock::{LockPolicy, QueueLock};

use crate::config::QueueConfig;

/// Queue operation failures. An empty queue is not one of them.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Existing content could not be parsed. Nothing was written.
    #[error("queue file {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process held the lock for every attempt.
    #[error("queue lock {} busy after {attempts} attempts", path.display())]
    Lock { path: PathBuf, attempts: u32 },

    #[error("failed to encode queue document: {0}")]
    Encode(#[from] serde_json::Error),

    /// The blocking task running a queue operation panicked or was cancelled.
    #[error("queue task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Handle on the queue file. Cheap to clone; holds no open file or lock.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    path: PathBuf,
    lock_path: PathBuf,
    policy: LockPolicy,
}

impl NotificationQueue {
    pub fn new(path: impl Into<PathBuf>, policy: LockPolicy) -> Self {
        let path = path.into();
        let mut lock_name = path.clone().into_os_string();
        lock_name.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock_name),
            policy,
        }
    }

    pub fn from_config(cfg: &QueueConfig) -> Self {
        Self::new(cfg.path.clone(), LockPolicy::from_config(cfg))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the queue file currently exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Add one entry at the back. Returns the new queue length.
    pub fn append(&self, entry: impl Into<QueueEntry>) -> Result<usize, QueueError> {
        self.append_all(std::iter::once(entry))
    }

    /// Add several entries at the back in one locked rewrite.
    ///
    /// Either every entry lands or none does. Returns the new queue length.
    pub fn append_all<I>(&self, entries: I) -> Result<usize, QueueError>
    where
        I: IntoIterator,
        I::Item: Into<QueueEntry>,
    {
        let entries: Vec<QueueEntry> = entries.into_iter().map(Into::into).collect();
        let _lock = self.lock()?;
        let mut doc = self.read()?.unwrap_or_default();
        if entries.is_empty() {
            return Ok(doc.notifications.len());
        }
        let added = entries.len();
        doc.notifications.extend(entries);
        self.write(&doc)?;
        debug!(
            target: "fbowatch::queue",
            path = %self.path.display(),
            added,
            depth = doc.notifications.len(),
            "Appended notifications"
        );
        Ok(doc.notifications.len())
    }

    /// Remove and return the front entry, or `None` when the queue is empty.
    pub fn drain_one(&self) -> Result<Option<QueueEntry>, QueueError> {
        let _lock = self.lock()?;
        let Some(mut doc) = self.read()? else {
            return Ok(None);
        };
        let Some(entry) = doc.notifications.pop_front() else {
            return Ok(None);
        };
        self.write(&doc)?;
        Ok(Some(entry))
    }

    /// The front entry without removing it.
    pub fn front(&self) -> Result<Option<QueueEntry>, QueueError> {
        let _lock = self.lock()?;
        Ok(self
            .read()?
            .and_then(|mut doc| doc.notifications.pop_front()))
    }

    /// Remove the front entry if it is still `sent`.
    ///
    /// Used after a successful delivery of an entry obtained from `front`.
    /// Returns `false` (and leaves the file alone) if the front changed in
    /// the meantime, which only happens if something else drained it.
    pub fn acknowledge(&self, sent: &QueueEntry) -> Result<bool, QueueError> {
        let _lock = self.lock()?;
        let Some(mut doc) = self.read()? else {
            return Ok(false);
        };
        if doc.notifications.front() != Some(sent) {
            warn!(
                target: "fbowatch::queue",
                path = %self.path.display(),
                "Front of queue changed before acknowledgement; leaving queue as is"
            );
            return Ok(false);
        }
        doc.notifications.pop_front();
        self.write(&doc)?;
        Ok(true)
    }

    /// Number of queued entries.
    pub fn len(&self) -> Result<usize, QueueError> {
        let _lock = self.lock()?;
        Ok(self.read()?.map_or(0, |doc| doc.notifications.len()))
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        self.len().map(|n| n == 0)
    }

    /// Run a queue operation on tokio's blocking pool.
    ///
    /// Lock retries sleep the calling thread, so async callers go through
    /// here instead of calling the operations directly.
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T, QueueError>
    where
        F: FnOnce(&NotificationQueue) -> Result<T, QueueError> + Send + 'static,
        T: Send + 'static,
    {
        let queue = self.clone();
        tokio::task::spawn_blocking(move || op(&queue)).await?
    }

    fn lock(&self) -> Result<QueueLock, QueueError> {
        QueueLock::acquire(&self.lock_path, &self.policy)
    }

    /// Current document, or `None` if the file does not exist. Caller holds the lock.
    fn read(&self) -> Result<Option<QueueDocument>, QueueError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(QueueError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        QueueDocument::decode(&bytes)
            .map(Some)
            .map_err(|e| QueueError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Replace the file atomically. Caller holds the lock.
    fn write(&self, doc: &QueueDocument) -> Result<(), QueueError> {
        let bytes = doc.encode()?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let io_err = |source| QueueError::Io {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationEvent;
    use std::time::Duration;
    use tempfile::TempDir;

    fn queue_in(dir: &TempDir) -> NotificationQueue {
        NotificationQueue::new(
            dir.path().join("fsedisco_msg.json"),
            LockPolicy {
                attempts: 2,
                retry_delay: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn append_then_drain_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        let ev = NotificationEvent::new("FSE FBO Update", "Airports with supply warnings:\nKXYZ 2");

        assert_eq!(q.append(ev.clone()).unwrap(), 1);
        assert_eq!(q.drain_one().unwrap(), Some(QueueEntry::Event(ev)));

        let doc = QueueDocument::decode(&std::fs::read(q.path()).unwrap()).unwrap();
        assert!(doc.notifications.is_empty());
    }

    #[test]
    fn absent_file_drains_empty_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        for _ in 0..3 {
            assert_eq!(q.drain_one().unwrap(), None);
        }
        assert!(!q.exists());
        assert_eq!(q.len().unwrap(), 0);
    }

    #[test]
    fn zero_byte_file_is_empty_not_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        std::fs::write(q.path(), b"").unwrap();

        assert_eq!(q.drain_one().unwrap(), None);
        assert_eq!(q.drain_one().unwrap(), None);
        assert_eq!(std::fs::read(q.path()).unwrap(), b"");

        q.append(QueueEntry::Message("first".into())).unwrap();
        assert_eq!(q.len().unwrap(), 1);
    }

    #[test]
    fn order_is_preserved_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let events: Vec<NotificationEvent> = (1..=3)
            .map(|i| NotificationEvent::new(format!("e{i}"), ""))
            .collect();

        // Separate handles stand in for separate process invocations.
        for ev in &events {
            queue_in(&dir).append(ev.clone()).unwrap();
        }

        let reader = queue_in(&dir);
        for ev in &events {
            assert_eq!(reader.drain_one().unwrap(), Some(QueueEntry::Event(ev.clone())));
        }
        assert_eq!(reader.drain_one().unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        let garbage = b"{\"notifications\": [\"half a mess";
        std::fs::write(q.path(), garbage).unwrap();

        assert!(matches!(
            q.append(NotificationEvent::new("t", "b")),
            Err(QueueError::Corrupt { .. })
        ));
        assert!(matches!(q.drain_one(), Err(QueueError::Corrupt { .. })));
        assert!(matches!(q.front(), Err(QueueError::Corrupt { .. })));
        assert_eq!(std::fs::read(q.path()).unwrap(), garbage);
    }

    #[test]
    fn batch_lands_together_after_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        q.append(QueueEntry::Message("older".into())).unwrap();

        let batch = ["supply", "jet-a", "avgas"].map(|t| NotificationEvent::new(t, ""));
        assert_eq!(q.append_all(batch).unwrap(), 4);

        let mut seen = Vec::new();
        while let Some(e) = q.drain_one().unwrap() {
            seen.push(format!("{}{}", e.title(), e.body()));
        }
        assert_eq!(seen, vec!["older", "supply", "jet-a", "avgas"]);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        std::fs::write(q.path(), b"{oops").unwrap();

        let batch = ["supply", "jet-a", "avgas"].map(|t| NotificationEvent::new(t, ""));
        assert!(matches!(q.append_all(batch.clone()), Err(QueueError::Corrupt { .. })));
        assert_eq!(std::fs::read(q.path()).unwrap(), b"{oops");

        std::fs::remove_file(q.path()).unwrap();
        let mut lock_path = q.path().as_os_str().to_owned();
        lock_path.push(".lock");
        let held = QueueLock::acquire(Path::new(&lock_path), &LockPolicy::default()).unwrap();
        assert!(matches!(q.append_all(batch), Err(QueueError::Lock { .. })));
        drop(held);
        assert!(!q.exists());
    }

    #[tokio::test]
    async fn blocking_pool_runs_queue_operations() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        let depth = q
            .run_blocking(|q| q.append(QueueEntry::Message("async".into())))
            .await
            .unwrap();
        assert_eq!(depth, 1);
        assert_eq!(
            q.run_blocking(|q| q.drain_one()).await.unwrap(),
            Some(QueueEntry::Message("async".into()))
        );
    }

    #[test]
    fn empty_batch_does_not_create_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        assert_eq!(q.append_all(Vec::<QueueEntry>::new()).unwrap(), 0);
        assert!(!q.exists());
    }

    #[test]
    fn legacy_document_is_drained_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        std::fs::write(
            q.path(),
            "{\n    \"notifications\": [\n        \"one\",\n        \"two\"\n    ]\n}",
        )
        .unwrap();
        q.append(NotificationEvent::new("three", "")).unwrap();

        assert_eq!(q.drain_one().unwrap(), Some(QueueEntry::Message("one".into())));
        assert_eq!(q.drain_one().unwrap(), Some(QueueEntry::Message("two".into())));
        assert_eq!(
            q.drain_one().unwrap().map(|e| e.title().to_string()),
            Some("three".into())
        );
    }

    #[test]
    fn front_and_acknowledge() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        q.append(QueueEntry::Message("a".into())).unwrap();
        q.append(QueueEntry::Message("b".into())).unwrap();

        let head = q.front().unwrap().unwrap();
        assert_eq!(head, QueueEntry::Message("a".into()));
        assert_eq!(q.len().unwrap(), 2);

        assert!(q.acknowledge(&head).unwrap());
        // Already gone: a second acknowledgement must not remove "b".
        assert!(!q.acknowledge(&head).unwrap());
        assert_eq!(q.front().unwrap(), Some(QueueEntry::Message("b".into())));
    }

    #[test]
    fn busy_lock_fails_without_touching_file() {
        let dir = tempfile::tempdir().unwrap();
        let q = queue_in(&dir);
        q.append(QueueEntry::Message("keep".into())).unwrap();
        let before = std::fs::read(q.path()).unwrap();

        let mut lock_path = q.path().as_os_str().to_owned();
        lock_path.push(".lock");
        let _held = QueueLock::acquire(Path::new(&lock_path), &LockPolicy::default()).unwrap();

        assert!(matches!(q.drain_one(), Err(QueueError::Lock { .. })));
        assert!(matches!(
            q.append(QueueEntry::Message("x".into())),
            Err(QueueError::Lock { .. })
        ));
        assert_eq!(std::fs::read(q.path()).unwrap(), before);
    }

    #[test]
    fn concurrent_appenders_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fsedisco_msg.json");
        let policy = LockPolicy {
            attempts: 500,
            retry_delay: Duration::from_millis(2),
        };

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let q = NotificationQueue::new(path.clone(), policy);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        q.append(QueueEntry::Message(format!("{t}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let q = NotificationQueue::new(path, policy);
        assert_eq!(q.len().unwrap(), 40);
        // Per-writer order is preserved.
        let mut seen = Vec::new();
        while let Some(e) = q.drain_one().unwrap() {
            seen.push(e.body().to_string());
        }
        for t in 0..4 {
            let prefix = format!("{t}-");
            let mine: Vec<&String> = seen.iter().filter(|s| s.starts_with(&prefix)).collect();
            let expected: Vec<String> = (0..10).map(|i| format!("{t}-{i}")).collect();
            assert_eq!(mine, expected.iter().collect::<Vec<_>>());
        }
    }
}
