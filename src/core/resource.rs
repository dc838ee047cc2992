use crate::errors::Result;
use async_trait::async_trait;

/// One external resource the single-flight loader can bring up.
///
/// `fetch` performs the actual injection/network work and resolves when the
/// platform signals load or error; `validate` runs afterwards and confirms the
/// resource is actually usable (typically: the expected global appeared). Both
/// failures look the same to callers of `ensure_loaded`.
#[async_trait]
pub trait ScriptResource: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Inject the script tag (or equivalent) and await its load/error event.
    async fn fetch(&self) -> Result<()>;

    /// Post-load validation; called once fetch has succeeded.
    async fn validate(&self) -> Result<()>;
}
