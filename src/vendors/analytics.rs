use crate::core::{AnalyticsConfig, Config, PageHandle, ScriptResource};
use crate::errors::{LoaderError, Result};
use crate::inject::ScriptInjector;
use crate::loader::SingleFlight;
use crate::types::ScriptTag;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

static INSTANCE: OnceCell<AnalyticsLoader> = OnceCell::new();

const TAG_ID: &str = "lazytag-analytics";

/// Lazy loader for the analytics tag.
///
/// Analytics is best-effort: feature methods never fail the caller because
/// the tag could not be loaded; the event is dropped with a warn log. Actual
/// page evaluation errors after a successful load still propagate.
pub struct AnalyticsLoader {
    flight: SingleFlight<AnalyticsScript>,
    page: Arc<dyn PageHandle>,
    config: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event_id: String,
    pub name: String,
    pub payload: Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

struct AnalyticsScript {
    page: Arc<dyn PageHandle>,
    config: AnalyticsConfig,
    injector: ScriptInjector,
}

#[async_trait]
impl ScriptResource for AnalyticsScript {
    fn name(&self) -> &str {
        "analytics"
    }

    async fn fetch(&self) -> Result<()> {
        let mut url = Url::parse(&self.config.script_url)
            .map_err(|e| LoaderError::ConfigurationError(e.to_string()))?;
        if !self.config.site_id.is_empty() {
            url.query_pairs_mut().append_pair("id", &self.config.site_id);
        }

        // The data layer must exist before the tag script runs so early
        // events are not lost.
        let bootstrap = format!(
            "window.{global} = window.{global} || [];",
            global = self.config.data_layer_global
        );
        self.page.eval(&bootstrap).await?;

        let tag = ScriptTag::new(TAG_ID, url.as_str());
        self.injector.load_script(self.page.as_ref(), &tag).await
    }

    async fn validate(&self) -> Result<()> {
        self.injector
            .wait_for_global(self.page.as_ref(), &self.config.data_layer_global)
            .await
    }
}

impl AnalyticsLoader {
    pub fn new(page: Arc<dyn PageHandle>, config: &Config) -> Self {
        let script = AnalyticsScript {
            page: Arc::clone(&page),
            config: config.analytics.clone(),
            injector: ScriptInjector::new(config.injection.clone()),
        };
        Self {
            flight: SingleFlight::new(script),
            page,
            config: config.analytics.clone(),
        }
    }

    /// Process-wide instance, created on first call. The page handle and
    /// config bind on the first call only; later arguments are ignored.
    pub fn instance(page: Arc<dyn PageHandle>, config: &Config) -> &'static AnalyticsLoader {
        INSTANCE.get_or_init(|| AnalyticsLoader::new(page, config))
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

    /// Push an event onto the data layer. Dropped with a warn log if the tag
    /// is unavailable.
    pub async fn track_event(&self, name: &str, payload: Value) -> Result<()> {
        if let Err(err) = self.flight.ensure_loaded().await {
            warn!("analytics unavailable, dropping event '{}': {}", name, err);
            return Ok(());
        }

        let event = AnalyticsEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            payload,
            timestamp: chrono::Utc::now(),
        };
        let serialized = serde_json::to_string(&event)
            .map_err(|e| LoaderError::SerializationError(e.to_string()))?;

        debug!("pushing analytics event '{}'", name);
        let script = format!(
            "window.{}.push({})",
            self.config.data_layer_global, serialized
        );
        self.page.eval(&script).await?;
        Ok(())
    }

    pub async fn track_page_view(&self) -> Result<()> {
        let url = self.page.url().await?;
        self.track_event("page_view", serde_json::json!({ "url": url }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InjectionConfig;
    use crate::testing::FakePage;
    use serde_json::json;

    fn quick_config() -> Config {
        Config {
            injection: InjectionConfig {
                load_timeout_ms: 50,
                validation_timeout_ms: 50,
                poll_interval_ms: 5,
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn pushes_event_once_tag_is_loaded() {
        // bootstrap, inject, poll -> ok, validate -> true
        let page = Arc::new(FakePage::scripted(vec![
            json!(null),
            json!("pending"),
            json!("ok"),
            json!(true),
        ]));
        let loader = AnalyticsLoader::new(page.clone(), &quick_config());

        loader
            .track_event("add_to_cart", json!({ "sku": "RUST-BOOK-001" }))
            .await
            .unwrap();

        assert!(loader.is_loaded());
        let evaluated = page.evaluated();
        let push = evaluated.last().unwrap();
        assert!(push.contains("window.dataLayer.push"));
        assert!(push.contains("add_to_cart"));
        assert!(push.contains("RUST-BOOK-001"));
    }

    #[tokio::test]
    async fn drops_event_when_tag_is_unavailable() {
        // bootstrap, inject, poll -> error
        let page = Arc::new(FakePage::scripted(vec![
            json!(null),
            json!("pending"),
            json!("error"),
        ]));
        let loader = AnalyticsLoader::new(page.clone(), &quick_config());

        loader.track_event("page_view", json!({})).await.unwrap();

        assert!(!loader.is_loaded());
        assert!(!page.evaluated().iter().any(|s| s.contains(".push(")));
    }

    #[tokio::test]
    async fn singleton_returns_the_same_instance() {
        let page: Arc<dyn PageHandle> = Arc::new(FakePage::new());
        let first = AnalyticsLoader::instance(Arc::clone(&page), &quick_config());
        let second = AnalyticsLoader::instance(page, &quick_config());
        assert!(std::ptr::eq(first, second));
    }
}
