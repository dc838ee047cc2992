use crate::core::PageHandle;
use crate::errors::{LoaderError, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;

/// Live Chrome page backing the production `PageHandle`.
pub struct ChromePage {
    tab: Arc<Tab>,
}

/// Owns the browser process; the page handle is only valid while the session
/// is alive.
pub struct ChromeSession {
    browser: Browser,
    page: Arc<ChromePage>,
}

impl ChromeSession {
    pub fn launch(headless: bool) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(headless)
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
            ])
            .build()
            .map_err(|e| LoaderError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| LoaderError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| LoaderError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            browser,
            page: Arc::new(ChromePage { tab }),
        })
    }

    pub fn page(&self) -> Arc<ChromePage> {
        Arc::clone(&self.page)
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .tab
            .navigate_to(url)
            .map_err(|e| LoaderError::NavigationFailed(e.to_string()))?;

        self.page
            .tab
            .wait_until_navigated()
            .map_err(|e| LoaderError::NavigationFailed(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn eval(&self, script: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| LoaderError::EvalFailed(e.to_string()))?;

        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }
}
