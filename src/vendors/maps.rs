use crate::core::{Config, MapsConfig, PageHandle, ScriptResource};
use crate::errors::{LoaderError, Result};
use crate::inject::injector::escape_js;
use crate::inject::ScriptInjector;
use crate::loader::SingleFlight;
use crate::types::ScriptTag;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

static INSTANCE: OnceCell<MapsLoader> = OnceCell::new();

const TAG_ID: &str = "lazytag-maps";

/// Lazy loader for the maps SDK.
///
/// Unlike analytics, the SDK is a functional dependency: feature methods
/// propagate load and validation failures to the caller.
pub struct MapsLoader {
    flight: SingleFlight<MapsScript>,
    page: Arc<dyn PageHandle>,
    config: MapsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapOptions {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
}

struct MapsScript {
    page: Arc<dyn PageHandle>,
    config: MapsConfig,
    injector: ScriptInjector,
}

#[async_trait]
impl ScriptResource for MapsScript {
    fn name(&self) -> &str {
        "maps"
    }

    async fn fetch(&self) -> Result<()> {
        if self.config.api_key.is_empty() {
            return Err(LoaderError::ConfigurationError(
                "maps api key is not set".to_string(),
            ));
        }

        let src = self.config.script_url.replace("{key}", &self.config.api_key);
        let url =
            Url::parse(&src).map_err(|e| LoaderError::ConfigurationError(e.to_string()))?;

        let tag = ScriptTag::new(TAG_ID, url.as_str());
        self.injector.load_script(self.page.as_ref(), &tag).await
    }

    async fn validate(&self) -> Result<()> {
        self.injector
            .wait_for_global(self.page.as_ref(), &self.config.sdk_global)
            .await
    }
}

impl MapsLoader {
    pub fn new(page: Arc<dyn PageHandle>, config: &Config) -> Self {
        let script = MapsScript {
            page: Arc::clone(&page),
            config: config.maps.clone(),
            injector: ScriptInjector::new(config.injection.clone()),
        };
        Self {
            flight: SingleFlight::new(script),
            page,
            config: config.maps.clone(),
        }
    }

    /// Process-wide instance, created on first call. The page handle and
    /// config bind on the first call only; later arguments are ignored.
    pub fn instance(page: Arc<dyn PageHandle>, config: &Config) -> &'static MapsLoader {
        INSTANCE.get_or_init(|| MapsLoader::new(page, config))
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

    /// Instantiate a map in the container matched by `selector`.
    pub async fn create_map(&self, selector: &str, options: &MapOptions) -> Result<()> {
        self.flight.ensure_loaded().await?;

        let script = format!(
            "new {sdk}.Map(document.querySelector('{selector}'), \
             {{ center: {{ lat: {lat}, lng: {lng} }}, zoom: {zoom} }})",
            sdk = self.config.sdk_global,
            selector = escape_js(selector),
            lat = options.lat,
            lng = options.lng,
            zoom = options.zoom,
        );
        self.page.eval(&script).await?;
        Ok(())
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
            maps: MapsConfig {
                api_key: "test-key".to_string(),
                ..MapsConfig::default()
            },
            injection: InjectionConfig {
                load_timeout_ms: 50,
                validation_timeout_ms: 50,
                poll_interval_ms: 5,
            },
            ..Config::default()
        }
    }

    fn map_options() -> MapOptions {
        MapOptions {
            lat: 55.6761,
            lng: 12.5683,
            zoom: 12,
        }
    }

    #[tokio::test]
    async fn create_map_evaluates_sdk_constructor() {
        // inject, poll -> ok, validate -> true
        let page = Arc::new(FakePage::scripted(vec![
            json!("pending"),
            json!("ok"),
            json!(true),
        ]));
        let loader = MapsLoader::new(page.clone(), &quick_config());

        loader.create_map("#store-map", &map_options()).await.unwrap();

        assert!(loader.is_loaded());
        let constructor = page.evaluated().last().unwrap().clone();
        assert!(constructor.contains("new google.maps.Map"));
        assert!(constructor.contains("#store-map"));
    }

    #[tokio::test]
    async fn load_failure_propagates_to_caller() {
        let page = Arc::new(FakePage::scripted(vec![json!("pending"), json!("error")]));
        let loader = MapsLoader::new(page, &quick_config());

        let err = loader
            .create_map("#store-map", &map_options())
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::LoadFailed(_)));
        assert!(!loader.is_loaded());
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        let page = Arc::new(FakePage::new());
        let mut config = quick_config();
        config.maps.api_key = String::new();
        let loader = MapsLoader::new(page, &config);

        let err = loader
            .create_map("#store-map", &map_options())
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn retry_is_possible_after_failure() {
        let page = Arc::new(FakePage::scripted(vec![
            // first attempt: inject, poll -> error
            json!("pending"),
            json!("error"),
            // second attempt: inject, poll -> ok, validate -> true
            json!("pending"),
            json!("ok"),
            json!(true),
        ]));
        let loader = MapsLoader::new(page, &quick_config());

        assert!(loader.ensure_loaded().await.is_err());
        assert!(!loader.is_loading());

        loader.ensure_loaded().await.unwrap();
        assert!(loader.is_loaded());
    }
}
