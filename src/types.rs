use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Externally visible loader status. Mirrors the internal slot without
/// exposing the shared in-flight handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
}

/// Description of one `<script>` element to append to the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptTag {
    /// Stable identifier; doubles as the status key the injected onload and
    /// onerror handlers write to.
    pub id: String,
    pub url: String,
    pub attributes: HashMap<String, String>,
}

impl ScriptTag {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}
