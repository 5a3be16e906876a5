//! Expired Entry Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{Codec, DiskCache};

/// Shortest pause between sweeps; smaller intervals are raised to this
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between sweeps.
/// Each sweep runs on tokio's blocking pool since it is plain filesystem I/O.
/// Sweep errors are logged and the loop keeps going. Intervals shorter than
/// [`MIN_SWEEP_INTERVAL`] are raised to it.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(DiskCache::open(&config)?);
/// let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_interval);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<C>(cache: Arc<DiskCache<C>>, interval: Duration) -> JoinHandle<()>
where
    C: Codec + 'static,
{
    let interval = effective_interval(interval);

    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            root = %cache.root().display(),
            "Starting cache sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let sweeper = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || sweeper.sweep()).await {
                Ok(Ok(removed)) if removed > 0 => {
                    info!(removed, "Cache sweep: removed expired entries");
                }
                Ok(Ok(_)) => debug!("Cache sweep: no expired entries found"),
                Ok(Err(e)) => warn!(error = %e, "Cache sweep incomplete"),
                Err(e) => error!(error = %e, "Cache sweep panicked"),
            }
        }
    })
}

fn effective_interval(interval: Duration) -> Duration {
    if interval < MIN_SWEEP_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            "Sweep interval too short, using minimum"
        );
        MIN_SWEEP_INTERVAL
    } else {
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_effective_interval_clamps_short_intervals() {
        assert_eq!(effective_interval(Duration::ZERO), MIN_SWEEP_INTERVAL);
        assert_eq!(effective_interval(Duration::from_micros(1)), MIN_SWEEP_INTERVAL);
        assert_eq!(effective_interval(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sweep_task_with_zero_interval_still_sweeps() {
        let temp = tempdir().unwrap();
        let cache = Arc::new(DiskCache::new(temp.path()).unwrap());

        cache
            .put("expire_soon", "value", Some(Duration::from_millis(50)))
            .unwrap();
        cache.put("kept", "value", None).unwrap();

        let handle = spawn_sweep_task(cache.clone(), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(!cache.entry_path("expire_soon").exists());
        assert!(cache.entry_path("kept").exists());

        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let temp = tempdir().unwrap();
        let cache = Arc::new(DiskCache::new(temp.path()).unwrap());

        cache
            .put("expire_soon", "value", Some(Duration::from_millis(200)))
            .unwrap();

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(300));

        // Wait for entry to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert!(
            !cache.entry_path("expire_soon").exists(),
            "Expired entry should have been swept"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let temp = tempdir().unwrap();
        let cache = Arc::new(DiskCache::new(temp.path()).unwrap());

        cache
            .put("long_lived", "value", Some(Duration::from_secs(3600)))
            .unwrap();

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(500)).await;

        let result: Option<String> = cache.get("long_lived").unwrap();
        assert_eq!(result.as_deref(), Some("value"), "Valid entry should not be removed");

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let temp = tempdir().unwrap();
        let cache = Arc::new(DiskCache::new(temp.path()).unwrap());

        let handle = spawn_sweep_task(cache, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
