//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Presentation knobs for derived values. Evaluation semantics do not
/// depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Shown instead of a calculated value whose formula fails.
    pub placeholder: String,
    /// Round and pad calculated values to this many places. `None` shows
    /// the normalized decimal (`108`, `12.5`).
    pub decimal_places: Option<u32>,
}

pub const DEFAULT_PLACEHOLDER: &str = "—";

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            decimal_places: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg: EngineConfig = serde_json::from_value(serde_json::json!({
            "decimal_places": 2
        }))
        .unwrap();
        assert_eq!(cfg.placeholder, "—");
        assert_eq!(cfg.decimal_places, Some(2));
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<EngineConfig, _> =
            serde_json::from_value(serde_json::json!({ "placeholdr": "n/a" }));
        assert!(result.is_err());
    }
}
