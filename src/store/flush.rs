//! Background flushing
//!
//! A thread that writes dirty users back on a fixed interval, clears stale
//! daily counters, and does a last flush when stopped.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::cache::WriteBackCache;
use crate::clock::Clock;

/// Handle to the running flush thread
#[derive(Debug)]
pub struct FlushLoop {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl FlushLoop {
    /// Start flushing `cache` every `interval`
    pub fn spawn(cache: Arc<WriteBackCache>, clock: Arc<dyn Clock>, interval: Duration) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("user-flush".to_string())
            .spawn(move || {
                log::info!("Flush loop started ({:?} interval)", interval);
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            cache.reset_stale_days(clock.now().date_naive());
                            cache.flush();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                let report = cache.flush();
                if report.failed > 0 {
                    log::error!("Final flush left {} users unsaved", report.failed);
                }
                log::info!("Flush loop stopped");
            })?;

        Ok(Self { stop, handle })
    }

    /// Stop the loop and wait for its final flush
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            log::error!("Flush thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::MemoryStore;

    #[test]
    fn test_stop_flushes_pending_users() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(WriteBackCache::new(store.clone()));
        let flush = FlushLoop::spawn(Arc::clone(&cache), Arc::new(SystemClock), Duration::from_secs(3600)).unwrap();

        cache.with_user(4, |u| u.xp = 321).unwrap();
        flush.stop();

        assert_eq!(store.peek(4).unwrap().xp, 321);
        assert_eq!(cache.dirty_count(), 0);
    }

    #[test]
    fn test_periodic_flush() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(WriteBackCache::new(store.clone()));
        cache.with_user(4, |u| u.coins = 12).unwrap();

        let flush = FlushLoop::spawn(Arc::clone(&cache), Arc::new(SystemClock), Duration::from_millis(10)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while cache.dirty_count() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        flush.stop();

        assert_eq!(store.peek(4).unwrap().coins, 12);
    }
}
