//! Advisory lock guarding queue mutations across processes.
//!
//! The lock lives on a sidecar file (`<queue>.lock`) rather than the queue
//! itself because the queue is replaced by rename on every write. The sidecar
//! is never removed; only the OS lock on it matters. The lock is released
//! when the guard is dropped, or by the OS if the process dies.

use rand::random_range;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{trace, warn};

use super::QueueError;
use crate::config::QueueConfig;

/// How hard to try for the lock before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl LockPolicy {
    pub fn from_config(cfg: &QueueConfig) -> Self {
        Self {
            attempts: cfg.lock_attempts.max(1),
            retry_delay: Duration::from_millis(cfg.lock_retry_ms),
        }
    }

    /// Base delay plus up to 50% random jitter.
    fn next_delay(&self) -> Duration {
        let base = self.retry_delay.as_millis() as u64;
        Duration::from_millis(base + random_range(0..=base / 2))
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

/// Held exclusive lock. Dropping it unlocks.
#[derive(Debug)]
pub struct QueueLock {
    file: File,
    path: PathBuf,
}

impl QueueLock {
    /// Take the exclusive lock on `path`, creating the file if needed.
    ///
    /// Blocks the calling thread between attempts.
    pub fn acquire(path: &Path, policy: &LockPolicy) -> Result<Self, QueueError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| QueueError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        for attempt in 1..=policy.attempts {
            match file.try_lock() {
                Ok(()) => {
                    trace!(
                        target: "fbowatch::queue",
                        path = %path.display(),
                        attempt,
                        "Queue lock acquired"
                    );
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(TryLockError::WouldBlock) => {
                    if attempt < policy.attempts {
                        thread::sleep(policy.next_delay());
                    }
                }
                Err(TryLockError::Error(source)) => {
                    return Err(QueueError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }

        warn!(
            target: "fbowatch::queue",
            path = %path.display(),
            attempts = policy.attempts,
            "Queue lock still held by another process; giving up"
        );
        Err(QueueError::Lock {
            path: path.to_path_buf(),
            attempts: policy.attempts,
        })
    }
}

impl Drop for QueueLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(
                target: "fbowatch::queue",
                path = %self.path.display(),
                error = %e,
                "Failed to release queue lock"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> LockPolicy {
        LockPolicy {
            attempts: 2,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn second_holder_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.json.lock");

        let held = QueueLock::acquire(&path, &quick()).unwrap();
        let err = QueueLock::acquire(&path, &quick()).unwrap_err();
        assert!(matches!(err, QueueError::Lock { attempts: 2, .. }));

        drop(held);
        assert!(QueueLock::acquire(&path, &quick()).is_ok());
    }

    #[test]
    fn policy_from_config_never_zero_attempts() {
        let cfg = QueueConfig {
            lock_attempts: 0,
            ..QueueConfig::default()
        };
        assert_eq!(LockPolicy::from_config(&cfg).attempts, 1);
    }

    #[test]
    fn jitter_stays_within_half_the_base() {
        let p = LockPolicy {
            attempts: 1,
            retry_delay: Duration::from_millis(40),
        };
        for _ in 0..50 {
            let d = p.next_delay();
            assert!(d >= Duration::from_millis(40) && d <= Duration::from_millis(60));
        }
    }
}
