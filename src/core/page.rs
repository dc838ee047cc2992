use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;

/// The seam between loaders and the host page.
///
/// Production code drives a real Chrome tab (see `inject::chrome`); tests use
/// an in-memory fake with scripted responses.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Evaluate a JavaScript expression in the page and return its value.
    async fn eval(&self, script: &str) -> Result<Value>;

    /// Current page URL, used for log context and analytics page views.
    async fn url(&self) -> Result<String>;
}
