pub mod config;
pub mod page;
pub mod resource;

pub use config::{AnalyticsConfig, Config, InjectionConfig, MapsConfig, OverlayConfig};
pub use page::PageHandle;
pub use resource::ScriptResource;
