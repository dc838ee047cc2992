use crate::core::ScriptResource;
use crate::errors::{LoaderError, Result};
use crate::types::LoadStatus;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

type Outcome = Option<Result<()>>;

/// Loader state for one external resource. `Loading` carries the shared
/// handle every concurrent caller awaits; holding it here (rather than a pair
/// of booleans) makes loaded-and-loading-at-once unrepresentable.
enum Slot {
    Idle,
    Loading(watch::Receiver<Outcome>),
    Loaded,
}

/// Brings one external resource up at most once per process lifetime.
///
/// Any number of callers may race on `ensure_loaded`; all callers arriving
/// while an attempt is in flight await that same attempt instead of starting
/// their own. A failed attempt resets the loader so the next explicit call
/// retries; nothing retries automatically. Once loaded, the loader never
/// unloads.
pub struct SingleFlight<R: ScriptResource> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    resource: R,
    slot: Mutex<Slot>,
}

impl<R: ScriptResource> Clone for SingleFlight<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: ScriptResource> SingleFlight<R> {
    pub fn new(resource: R) -> Self {
        Self {
            inner: Arc::new(Inner {
                resource,
                slot: Mutex::new(Slot::Idle),
            }),
        }
    }

    pub fn resource(&self) -> &R {
        &self.inner.resource
    }

    /// Resolve once the resource is usable.
    ///
    /// Already loaded: resolves immediately with no side effects. An attempt
    /// in flight: awaits that attempt's outcome alongside every other caller.
    /// Otherwise starts a fresh attempt as a detached task, so abandoning
    /// this future does not abort the load.
    pub async fn ensure_loaded(&self) -> Result<()> {
        let mut rx = {
            let mut slot = self.lock_slot();
            match &*slot {
                Slot::Loaded => return Ok(()),
                Slot::Loading(rx) => rx.clone(),
                Slot::Idle => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Slot::Loading(rx.clone());
                    self.spawn_attempt(tx);
                    rx
                }
            }
        };

        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(LoaderError::LoadFailed(format!(
                    "load task for '{}' terminated before completing",
                    self.inner.resource.name()
                )));
            }
        }
    }

    pub fn status(&self) -> LoadStatus {
        match &*self.lock_slot() {
            Slot::Idle => LoadStatus::Idle,
            Slot::Loading(_) => LoadStatus::Loading,
            Slot::Loaded => LoadStatus::Loaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == LoadStatus::Loaded
    }

    pub fn is_loading(&self) -> bool {
        self.status() == LoadStatus::Loading
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        // Never held across an await; a poisoned lock still holds a valid Slot.
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_attempt(&self, tx: watch::Sender<Outcome>) {
        let inner = Arc::clone(&self.inner);
        debug!("starting load attempt for '{}'", inner.resource.name());

        tokio::spawn(async move {
            let outcome = async {
                inner.resource.fetch().await?;
                inner.resource.validate().await
            }
            .await;

            // The slot must reflect the terminal state before any awaiter can
            // observe the outcome: is_loading() is false the moment a caller
            // sees the result.
            {
                let mut slot = inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
                *slot = match &outcome {
                    Ok(()) => Slot::Loaded,
                    Err(_) => Slot::Idle,
                };
            }

            match &outcome {
                Ok(()) => info!("resource '{}' loaded", inner.resource.name()),
                Err(err) => warn!("load attempt for '{}' failed: {}", inner.resource.name(), err),
            }

            let _ = tx.send(Some(outcome));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeScript;

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let flight = SingleFlight::new(FakeScript::new());

        let mut handles = Vec::new();
        for _ in 0..3 {
            let flight = flight.clone();
            handles.push(tokio::spawn(async move { flight.ensure_loaded().await }));
        }

        flight.resource().fire(Ok(())).await;

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(flight.resource().fetch_calls(), 1);
        assert!(flight.is_loaded());
        assert!(!flight.is_loading());
    }

    #[tokio::test]
    async fn loaded_state_is_idempotent() {
        let flight = SingleFlight::new(FakeScript::new());

        let pending = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };
        flight.resource().fire(Ok(())).await;
        pending.await.unwrap().unwrap();

        // No new fetch once loaded.
        flight.ensure_loaded().await.unwrap();
        flight.ensure_loaded().await.unwrap();
        assert_eq!(flight.resource().fetch_calls(), 1);
        assert!(flight.is_loaded());
        assert!(!flight.is_loading());
    }

    #[tokio::test]
    async fn failure_reaches_every_awaiter() {
        let flight = SingleFlight::new(FakeScript::new());

        let first = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };
        let second = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };

        flight
            .resource()
            .fire(Err(LoaderError::LoadFailed("script error event".into())))
            .await;

        assert!(first.await.unwrap().is_err());
        assert!(second.await.unwrap().is_err());
        assert_eq!(flight.resource().fetch_calls(), 1);
        assert!(!flight.is_loaded());
        assert!(!flight.is_loading());
    }

    #[tokio::test]
    async fn explicit_retry_after_failure_succeeds() {
        let flight = SingleFlight::new(FakeScript::new());

        let first = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };
        flight
            .resource()
            .fire(Err(LoaderError::LoadTimeout(10000)))
            .await;
        assert!(first.await.unwrap().is_err());
        assert!(!flight.is_loading());

        let second = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };
        flight.resource().fire(Ok(())).await;
        second.await.unwrap().unwrap();

        assert_eq!(flight.resource().fetch_calls(), 2);
        assert!(flight.is_loaded());
    }

    #[tokio::test]
    async fn is_loading_reflects_inflight_attempt() {
        let flight = SingleFlight::new(FakeScript::new());
        assert_eq!(flight.status(), crate::types::LoadStatus::Idle);

        let pending = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };

        flight.resource().wait_until_fetching().await;
        assert!(flight.is_loading());
        assert!(!flight.is_loaded());

        flight.resource().fire(Ok(())).await;
        pending.await.unwrap().unwrap();
        assert_eq!(flight.status(), crate::types::LoadStatus::Loaded);
    }

    #[tokio::test]
    async fn validation_failure_behaves_like_load_failure() {
        let script = FakeScript::new();
        script.fail_validation_with(LoaderError::ValidationFailed(
            "global 'dataLayer' did not appear".into(),
        ));
        let flight = SingleFlight::new(script);

        let pending = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };
        flight.resource().fire(Ok(())).await;

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, LoaderError::ValidationFailed(_)));
        assert!(!flight.is_loaded());
        assert!(!flight.is_loading());
    }

    #[tokio::test]
    async fn abandoned_awaiter_does_not_abort_the_load() {
        let flight = SingleFlight::new(FakeScript::new());

        let abandoned = {
            let flight = flight.clone();
            tokio::spawn(async move { flight.ensure_loaded().await })
        };
        flight.resource().wait_until_fetching().await;
        abandoned.abort();

        // The detached load task still completes and updates shared state.
        flight.resource().fire(Ok(())).await;
        while !flight.is_loaded() {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        assert_eq!(flight.resource().fetch_calls(), 1);
    }
}
