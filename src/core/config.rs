use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub maps: MapsConfig,
    pub overlay: OverlayConfig,
    pub injection: InjectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub script_url: String,
    /// Global array the tag exposes after load; events are pushed onto it.
    pub data_layer_global: String,
    pub site_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// URL template; `{key}` is replaced with the API key.
    pub script_url: String,
    pub api_key: String,
    /// Dotted path checked during post-load validation, e.g. "google.maps".
    pub sdk_global: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub script_url: String,
    pub overlay_global: String,
    /// Extra panel styling injected after the bundle loads.
    pub panel_css: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionConfig {
    pub load_timeout_ms: u64,
    pub validation_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analytics: AnalyticsConfig::default(),
            maps: MapsConfig::default(),
            overlay: OverlayConfig::default(),
            injection: InjectionConfig::default(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            script_url: "https://www.googletagmanager.com/gtag/js".to_string(),
            data_layer_global: "dataLayer".to_string(),
            site_id: String::new(),
        }
    }
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            script_url: "https://maps.googleapis.com/maps/api/js?key={key}".to_string(),
            api_key: String::new(),
            sdk_global: "google.maps".to_string(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            script_url: "https://cdn.jsdelivr.net/npm/eruda".to_string(),
            overlay_global: "eruda".to_string(),
            panel_css: String::new(),
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 10000,
            validation_timeout_ms: 3000,
            poll_interval_ms: 100,
        }
    }
}
