use crate::core::{InjectionConfig, PageHandle};
use crate::errors::{LoaderError, Result};
use crate::types::ScriptTag;
use std::time::{Duration, Instant};
use tracing::debug;

/// Injects `<script>` elements into a page and observes their load/error
/// events through a per-tag status key under `window.__lazytag`.
pub struct ScriptInjector {
    config: InjectionConfig,
}

impl ScriptInjector {
    pub fn new(config: InjectionConfig) -> Self {
        Self { config }
    }

    /// Append the tag and resolve once its load event fires.
    pub async fn load_script(&self, page: &dyn PageHandle, tag: &ScriptTag) -> Result<()> {
        self.inject(page, tag).await?;
        self.await_load(page, &tag.id).await
    }

    /// Append the script element. Idempotent: a tag whose status key already
    /// exists is left alone.
    pub async fn inject(&self, page: &dyn PageHandle, tag: &ScriptTag) -> Result<()> {
        debug!("injecting script '{}' from {}", tag.id, tag.url);
        page.eval(&build_inject_js(tag)).await?;
        Ok(())
    }

    /// Poll the tag's status key until the load or error event has fired.
    pub async fn await_load(&self, page: &dyn PageHandle, tag_id: &str) -> Result<()> {
        let probe = format!(
            "window.__lazytag && window.__lazytag['{}']",
            escape_js(tag_id)
        );
        let start = Instant::now();
        let timeout = Duration::from_millis(self.config.load_timeout_ms);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let status = page.eval(&probe).await?;
            match status.as_str() {
                Some("ok") => return Ok(()),
                Some("error") => {
                    return Err(LoaderError::LoadFailed(format!(
                        "script '{}' fired its error event",
                        tag_id
                    )));
                }
                _ => {}
            }

            if start.elapsed() >= timeout {
                return Err(LoaderError::LoadTimeout(self.config.load_timeout_ms));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Poll a guarded `typeof` probe until the expected global appears.
    pub async fn wait_for_global(&self, page: &dyn PageHandle, expr: &str) -> Result<()> {
        let probe = format!(
            "(function() {{ try {{ return typeof ({}) !== 'undefined'; }} catch (e) {{ return false; }} }})()",
            expr
        );
        let start = Instant::now();
        let timeout = Duration::from_millis(self.config.validation_timeout_ms);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let present = page.eval(&probe).await?;
            if present.as_bool() == Some(true) {
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(LoaderError::ValidationFailed(format!(
                    "global '{}' did not appear within {}ms",
                    expr, self.config.validation_timeout_ms
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    pub async fn inject_css(&self, page: &dyn PageHandle, css: &str) -> Result<()> {
        let script = format!(
            r#"
            (function() {{
                const style = document.createElement('style');
                style.textContent = `{}`;
                document.head.appendChild(style);
                return true;
            }})()
            "#,
            css.replace('`', "\\`")
        );

        page.eval(&script).await?;
        Ok(())
    }
}

fn build_inject_js(tag: &ScriptTag) -> String {
    let mut attrs = String::new();
    for (name, value) in &tag.attributes {
        attrs.push_str(&format!(
            "s.setAttribute('{}', '{}');",
            escape_js(name),
            escape_js(value)
        ));
    }

    format!(
        r#"
        (function() {{
            if (!window.__lazytag) {{ window.__lazytag = {{}}; }}
            var status = window.__lazytag['{id}'];
            if (status) {{ return status; }}
            window.__lazytag['{id}'] = 'pending';
            var s = document.createElement('script');
            s.src = '{url}';
            s.async = true;
            {attrs}
            s.onload = function() {{ window.__lazytag['{id}'] = 'ok'; }};
            s.onerror = function() {{ window.__lazytag['{id}'] = 'error'; }};
            document.head.appendChild(s);
            return 'pending';
        }})()
        "#,
        id = escape_js(&tag.id),
        url = escape_js(&tag.url),
        attrs = attrs
    )
}

pub(crate) fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
