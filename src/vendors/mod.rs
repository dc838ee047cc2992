pub mod analytics;
pub mod maps;
pub mod overlay;

pub use analytics::{AnalyticsEvent, AnalyticsLoader};
pub use maps::{MapOptions, MapsLoader};
pub use overlay::DebugOverlayLoader;
