//! Collapses concurrent identical requests into one in-flight future
//!
//! Callers that arrive while a request for the same key is pending share
//! its outcome instead of starting their own. The pending entry is removed
//! when the request settles, before any waiter sees the result, so a
//! caller arriving afterwards always starts a fresh request.
//!
//! The request runs on its own tokio task, so it settles even when every
//! caller gives up waiting on it.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::panic;
use std::sync::{Arc, Mutex};
use tokio::task::JoinError;
use tracing::{debug, warn};

type PendingFuture<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;
type PendingTable<T, E> = Arc<Mutex<HashMap<String, PendingFuture<T, E>>>>;

/// Removes the table entry once the request task finishes or unwinds
struct SettleGuard<T, E> {
    table: PendingTable<T, E>,
    key: String,
}

impl<T, E> Drop for SettleGuard<T, E> {
    fn drop(&mut self) {
        self.table
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

/// Table of in-flight requests keyed by an application-chosen string
pub struct RequestDeduplicator<T, E> {
    pending: PendingTable<T, E>,
}

impl<T, E> RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    pub fn new() -> Self {
        RequestDeduplicator {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `producer` for `key` unless a request for `key` is already in flight
    ///
    /// # Arguments
    /// * `key` - Identifies "the same logical request"
    /// * `producer` - Starts the request; only invoked when nothing is pending
    ///
    /// # Returns
    /// The settled outcome, identical for every caller that joined the same flight.
    /// A panic in the request panics the waiting callers.
    pub async fn dedupe<F, Fut>(&self, key: &str, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let shared = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            match pending.get(key) {
                Some(existing) => {
                    debug!("joining in-flight request key={}", key);
                    existing.clone()
                }
                None => {
                    let table = Arc::clone(&self.pending);
                    let owned_key = key.to_string();
                    let request = producer();
                    let handle = tokio::spawn(async move {
                        let _settled = SettleGuard {
                            table,
                            key: owned_key,
                        };
                        request.await
                    });
                    let flight = async move {
                        match handle.await {
                            Ok(outcome) => outcome,
                            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
                            Err(e) => {
                                warn!("in-flight request task was cancelled: {}", e);
                                Err(E::from(e))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    pending.insert(key.to_string(), flight.clone());
                    flight
                }
            }
        };

        shared.await
    }

    /// Number of keys with a request in flight
    pub fn in_flight(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}

impl<T, E> Default for RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct TestError(String);

    impl From<JoinError> for TestError {
        fn from(err: JoinError) -> Self {
            TestError(err.to_string())
        }
    }

    fn boom() -> TestError {
        TestError("boom".to_string())
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_producer() {
        let dedup: RequestDeduplicator<u32, TestError> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = || {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<u32, TestError>(7)
            }
        };

        let (a, b) = tokio::join!(dedup.dedupe("k", make()), dedup.dedupe("k", make()));
        assert_eq!(a, Ok(7));
        assert_eq!(b, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_entry_removed() {
        let dedup: RequestDeduplicator<u32, TestError> = RequestDeduplicator::new();

        let (a, b) = tokio::join!(
            dedup.dedupe("k", || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<u32, TestError>(boom())
            }),
            dedup.dedupe("k", || async { Ok::<u32, TestError>(1) }),
        );
        assert_eq!(a, Err(boom()));
        assert_eq!(b, Err(boom()));
        assert!(!dedup.is_pending("k"));

        // Settled: the next call runs a fresh producer
        let c = dedup.dedupe("k", || async { Ok::<u32, TestError>(2) }).await;
        assert_eq!(c, Ok(2));
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let dedup: RequestDeduplicator<&'static str, TestError> = RequestDeduplicator::new();
        let (a, b) = tokio::join!(
            dedup.dedupe("a", || async { Ok::<_, TestError>("a") }),
            dedup.dedupe("b", || async { Ok::<_, TestError>("b") }),
        );
        assert_eq!(a, Ok("a"));
        assert_eq!(b, Ok("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_still_settles() {
        let dedup: RequestDeduplicator<u32, TestError> = RequestDeduplicator::new();
        let finished = Arc::new(AtomicBool::new(false));

        let done = Arc::clone(&finished);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            dedup.dedupe("k", move || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                done.store(true, Ordering::SeqCst);
                Ok::<u32, TestError>(1)
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(dedup.in_flight(), 0);
        assert!(!dedup.is_pending("k"));

        // A later caller starts its own request instead of joining the old one
        let fresh = Arc::new(AtomicBool::new(false));
        let invoked = Arc::clone(&fresh);
        let later = dedup
            .dedupe("k", move || async move {
                invoked.store(true, Ordering::SeqCst);
                Ok::<u32, TestError>(2)
            })
            .await;
        assert_eq!(later, Ok(2));
        assert!(fresh.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_request_clears_entry() {
        let dedup = Arc::new(RequestDeduplicator::<u32, TestError>::new());

        let joined = Arc::clone(&dedup);
        let caller = tokio::spawn(async move {
            joined
                .dedupe("k", || async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    if true {
                        panic!("producer exploded");
                    }
                    Ok::<u32, TestError>(0)
                })
                .await
        });

        let err = caller.await.unwrap_err();
        assert!(err.is_panic());
        assert!(!dedup.is_pending("k"));

        let next = dedup.dedupe("k", || async { Ok::<u32, TestError>(3) }).await;
        assert_eq!(next, Ok(3));
    }
}
