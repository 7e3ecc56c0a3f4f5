//! Session tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one front-end session.
///
/// Every field has a default, so a config file only names what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pause between entering a busy state and dispatching the request,
    /// giving the front-end a chance to render the busy indicator.
    pub dispatch_delay_ms: u64,
    /// Responses buffered per subscriber before the slowest one lags.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            dispatch_delay_ms: 100,
            channel_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// No dispatch delay; used by tests and non-interactive runs.
    pub fn immediate() -> Self {
        SessionConfig {
            dispatch_delay_ms: 0,
            ..SessionConfig::default()
        }
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: SessionConfig =
            serde_json::from_value(serde_json::json!({ "dispatch_delay_ms": 5 })).unwrap();
        assert_eq!(config.dispatch_delay(), Duration::from_millis(5));
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn immediate_has_no_delay() {
        assert!(SessionConfig::immediate().dispatch_delay().is_zero());
    }
}
