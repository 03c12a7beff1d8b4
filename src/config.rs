use serde::{Deserialize, Serialize};

/// How the merge resolves an attribute that first appears in a later save
/// and has no baseline value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBaseline {
    /// `before` is the prior value reported by the attribute's first save.
    #[default]
    FirstOccurrence,
    /// `before` is `NULL`.
    Null,
}

/// Change aggregator configuration
///
/// Each record builds its aggregator from one of these. Every field has a
/// default, so partial JSON documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Baseline resolution for attributes introduced mid-transaction
    pub missing_baseline: MissingBaseline,

    /// When disabled, commit observers see only the last save's changes
    pub enabled: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregatorConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self {
            missing_baseline: MissingBaseline::FirstOccurrence,
            enabled: true,
        }
    }

    /// Set the missing-baseline policy
    pub fn missing_baseline(mut self, policy: MissingBaseline) -> Self {
        self.missing_baseline = policy;
        self
    }

    /// Enable or disable aggregation
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Parse from a JSON document
    ///
    /// # Examples
    ///
    /// ```
    /// use netchanges::{AggregatorConfig, MissingBaseline};
    ///
    /// let config = AggregatorConfig::from_json(r#"{"missing_baseline": "null"}"#).unwrap();
    /// assert_eq!(config.missing_baseline, MissingBaseline::Null);
    /// assert!(config.enabled);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid aggregator config: {}", e))
    }
}
