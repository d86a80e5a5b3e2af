//! Session Configuration
//!
//! Per-call configuration delivered by the transcript collaborator. All
//! fields can be updated mid-session; the scheduler treats an update as a
//! forced re-analysis trigger.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Number of scoring pillars. Pillar ids run 1..=PILLAR_COUNT.
pub const PILLAR_COUNT: u8 = 7;

/// Configuration for one live call session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Prospect classification tag (e.g. "inbound-lead", "referral").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prospect_type: Option<String>,
    /// Custom sales script text the coach wants scoring biased toward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_script: Option<String>,
    /// Per-pillar weight overrides, keyed by pillar id (1..=7).
    /// Values are clamped to [0, 10] when applied.
    #[serde(default)]
    pub weight_overrides: HashMap<u8, f64>,
}

impl SessionConfig {
    /// Validate that every override targets a known pillar.
    pub fn validate(&self) -> CoreResult<()> {
        for pillar in self.weight_overrides.keys() {
            if *pillar == 0 || *pillar > PILLAR_COUNT {
                return Err(CoreError::config(format!(
                    "weight override for unknown pillar {}",
                    pillar
                )));
            }
        }
        Ok(())
    }

    /// Set a single pillar weight override.
    pub fn with_weight_override(mut self, pillar: u8, weight: f64) -> Self {
        self.weight_overrides.insert(pillar, weight);
        self
    }

    /// Set the prospect type tag.
    pub fn with_prospect_type(mut self, tag: impl Into<String>) -> Self {
        self.prospect_type = Some(tag.into());
        self
    }

    /// Set the custom script text.
    pub fn with_custom_script(mut self, script: impl Into<String>) -> Self {
        self.custom_script = Some(script.into());
        self
    }
}
