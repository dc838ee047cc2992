#[cfg(feature = "chrome")]
pub mod chrome;
pub mod injector;

#[cfg(feature = "chrome")]
pub use chrome::{ChromePage, ChromeSession};
pub use injector::ScriptInjector;
