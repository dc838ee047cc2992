use crate::core::{Config, OverlayConfig, PageHandle, ScriptResource};
use crate::errors::Result;
use crate::inject::injector::escape_js;
use crate::inject::ScriptInjector;
use crate::loader::SingleFlight;
use crate::types::ScriptTag;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

static INSTANCE: OnceCell<DebugOverlayLoader> = OnceCell::new();

const TAG_ID: &str = "lazytag-overlay";

/// Lazy loader for the in-page debug overlay bundle. Must-succeed: the
/// overlay is useless half-loaded, so failures propagate.
pub struct DebugOverlayLoader {
    flight: SingleFlight<OverlayScript>,
    page: Arc<dyn PageHandle>,
    config: OverlayConfig,
}

struct OverlayScript {
    page: Arc<dyn PageHandle>,
    config: OverlayConfig,
    injector: ScriptInjector,
}

#[async_trait]
impl ScriptResource for OverlayScript {
    fn name(&self) -> &str {
        "debug-overlay"
    }

    async fn fetch(&self) -> Result<()> {
        let tag = ScriptTag::new(TAG_ID, &self.config.script_url);
        self.injector.load_script(self.page.as_ref(), &tag).await
    }

    async fn validate(&self) -> Result<()> {
        self.injector
            .wait_for_global(self.page.as_ref(), &self.config.overlay_global)
            .await?;

        if !self.config.panel_css.is_empty() {
            self.injector
                .inject_css(self.page.as_ref(), &self.config.panel_css)
                .await?;
        }
        Ok(())
    }
}

impl DebugOverlayLoader {
    pub fn new(page: Arc<dyn PageHandle>, config: &Config) -> Self {
        let script = OverlayScript {
            page: Arc::clone(&page),
            config: config.overlay.clone(),
            injector: ScriptInjector::new(config.injection.clone()),
        };
        Self {
            flight: SingleFlight::new(script),
            page,
            config: config.overlay.clone(),
        }
    }

    /// Process-wide instance, created on first call. The page handle and
    /// config bind on the first call only; later arguments are ignored.
    pub fn instance(page: Arc<dyn PageHandle>, config: &Config) -> &'static DebugOverlayLoader {
        INSTANCE.get_or_init(|| DebugOverlayLoader::new(page, config))
    }

    pub async fn ensure_loaded(&self) -> Result<()> {
        self.flight.ensure_loaded().await
    }

    pub fn is_loaded(&self) -> bool {
        self.flight.is_loaded()
    }

    pub fn is_loading(&self) -> bool {
        self.flight.is_loading()
    }

    pub async fn show(&self) -> Result<()> {
        self.call("show()").await
    }

    pub async fn hide(&self) -> Result<()> {
        self.call("hide()").await
    }

    /// Write a line to the overlay's console panel.
    pub async fn log(&self, level: &str, message: &str) -> Result<()> {
        self.call(&format!(
            "log('{}', '{}')",
            escape_js(level),
            escape_js(message)
        ))
        .await
    }

    async fn call(&self, invocation: &str) -> Result<()> {
        self.flight.ensure_loaded().await?;
        debug!("overlay call: {}", invocation);
        let script = format!("window.{}.{}", self.config.overlay_global, invocation);
        self.page.eval(&script).await?;
        Ok(())
    }
}
