pub mod core;
pub mod errors;
pub mod inject;
pub mod loader;
pub mod testing;
pub mod types;
pub mod vendors;

pub use crate::core::{Config, PageHandle, ScriptResource};
pub use errors::{LoaderError, Result};
#[cfg(feature = "chrome")]
pub use inject::{ChromePage, ChromeSession};
pub use inject::ScriptInjector;
pub use loader::SingleFlight;
pub use types::{LoadStatus, ScriptTag};
pub use vendors::{AnalyticsEvent, AnalyticsLoader, DebugOverlayLoader, MapOptions, MapsLoader};
