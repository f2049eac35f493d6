use serde::{Deserialize, Serialize};

use rmqtt_ext::hook::Priority;
use rmqtt_ext::Result;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginConfig {
    ///Hook priority, only orders this check among the other subscribe ACL handlers
    #[serde(default = "PluginConfig::priority_default")]
    pub priority: Priority,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self { priority: Self::priority_default() }
    }
}

impl PluginConfig {
    fn priority_default() -> Priority {
        100
    }

    #[inline]
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
