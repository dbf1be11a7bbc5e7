//! Single-initialization cache for full subsystem scans.
//!
//! A stored result lives as long as the cache; there is no invalidation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Holds the result of one full scan.
///
/// The lock is held while the scan runs, so concurrent first callers wait
/// for a single scan instead of racing. A failed scan stores nothing and the
/// next call scans again.
#[derive(Debug)]
pub struct ScanCache<T> {
    value: Mutex<Option<Arc<T>>>,
    scans: AtomicUsize,
}

impl<T> Default for ScanCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScanCache<T> {
    pub const fn new() -> Self {
        Self {
            value: Mutex::new(None),
            scans: AtomicUsize::new(0),
        }
    }

    /// Returns the stored result, running `scan` if there is none yet.
    pub fn get_or_scan<E>(&self, scan: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }

        self.scans.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(scan()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Returns the stored result without scanning.
    pub fn get(&self) -> Option<Arc<T>> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    /// Number of times a scan has been started.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::thread;

    #[test]
    fn test_scan_runs_once() {
        let cache: ScanCache<u32> = ScanCache::new();
        assert!(cache.get().is_none());

        let first = cache.get_or_scan(|| Ok::<_, Infallible>(7)).unwrap();
        let second = cache.get_or_scan(|| Ok::<_, Infallible>(8)).unwrap();

        assert_eq!(*first, 7);
        assert_eq!(*second, 7);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.scan_count(), 1);
    }

    #[test]
    fn test_failed_scan_is_not_stored() {
        let cache: ScanCache<u32> = ScanCache::new();

        assert_eq!(cache.get_or_scan(|| Err("malformed")), Err("malformed"));
        assert!(cache.get().is_none());

        let value = cache.get_or_scan(|| Ok::<_, &str>(3)).unwrap();
        assert_eq!(*value, 3);
        assert_eq!(cache.scan_count(), 2);
    }

    #[test]
    fn test_concurrent_callers_share_one_scan() {
        let cache: Arc<ScanCache<usize>> = Arc::new(ScanCache::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    *cache
                        .get_or_scan(|| {
                            thread::sleep(std::time::Duration::from_millis(10));
                            Ok::<_, Infallible>(i)
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.scan_count(), 1);
    }

    #[test]
    fn test_poisoned_lock_recovers() {
        let cache: Arc<ScanCache<u32>> = Arc::new(ScanCache::new());
        let poisoner = Arc::clone(&cache);
        let _ = thread::spawn(move || {
            let _ = poisoner.get_or_scan(|| -> Result<u32, Infallible> { panic!("scan panicked") });
        })
        .join();

        let value = cache.get_or_scan(|| Ok::<_, Infallible>(1)).unwrap();
        assert_eq!(*value, 1);
    }
}
