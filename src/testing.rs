use crate::core::{PageHandle, ScriptResource};
use crate::errors::{LoaderError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// In-memory page with scripted eval responses, for exercising loaders
/// without a browser. Responses are consumed front-to-back; once exhausted,
/// eval returns `Value::Null` (which pollers treat as "not yet").
pub struct FakePage {
    responses: Mutex<VecDeque<Value>>,
    evaluated: Mutex<Vec<String>>,
    url: String,
}

impl FakePage {
    pub fn new() -> Self {
        Self::with_url("https://shop.example.com/checkout")
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            evaluated: Mutex::new(Vec::new()),
            url: url.into(),
        }
    }

    pub fn scripted(responses: Vec<Value>) -> Self {
        let page = Self::new();
        for response in responses {
            page.push_response(response);
        }
        page
    }

    pub fn push_response(&self, value: Value) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(value);
    }

    /// Every script evaluated so far, in order.
    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn eval(&self, script: &str) -> Result<Value> {
        self.evaluated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(script.to_string());
        Ok(self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Value::Null))
    }

    async fn url(&self) -> Result<String> {
        Ok(self.url.clone())
    }
}

/// Script resource whose load event the test fires by hand.
///
/// Each `fetch` call parks on a oneshot channel until the test calls `fire`
/// with the outcome, mirroring a script tag waiting on its onload/onerror
/// event.
pub struct FakeScript {
    fetch_calls: AtomicUsize,
    pending: Mutex<VecDeque<oneshot::Sender<Result<()>>>>,
    validation: Mutex<Option<LoaderError>>,
}

impl FakeScript {
    pub fn new() -> Self {
        Self {
            fetch_calls: AtomicUsize::new(0),
            pending: Mutex::new(VecDeque::new()),
            validation: Mutex::new(None),
        }
    }

    /// Number of load attempts started so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Make the next `validate` call fail with the given error.
    pub fn fail_validation_with(&self, err: LoaderError) {
        *self
            .validation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    /// Complete the oldest in-flight fetch with `outcome`, waiting for one to
    /// register first if the attempt has not started yet.
    pub async fn fire(&self, outcome: Result<()>) {
        let tx = loop {
            let popped = self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match popped {
                Some(tx) => break tx,
                None => tokio::time::sleep(Duration::from_millis(1)).await,
            }
        };
        let _ = tx.send(outcome);
    }

    /// Wait until at least one fetch has started.
    pub async fn wait_until_fetching(&self) {
        while self.fetch_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl Default for FakeScript {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptResource for FakeScript {
    fn name(&self) -> &str {
        "fake-script"
    }

    async fn fetch(&self) -> Result<()> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(tx);
        rx.await
            .map_err(|_| LoaderError::LoadFailed("script event channel closed".to_string()))?
    }

    async fn validate(&self) -> Result<()> {
        match self
            .validation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
