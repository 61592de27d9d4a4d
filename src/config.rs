use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SettingsError;

/// Fade timing and decay constants.
///
/// These values were tuned by ear and the fade feel depends on them. They are named here (rather than
/// inlined at the call sites) so the fader can be tested against them and so
/// hosts can override them through `FadeSettings`.

/// Interval between fade ticks once the fader is armed.
pub const FADE_TICK_INTERVAL: Duration = Duration::from_millis(40);

/// Delay before the very first tick after arming, slightly longer than the
/// regular interval so the decay does not visibly overlap the stop gesture.
pub const FADE_FIRST_TICK_DELAY: Duration = Duration::from_millis(50);

/// Per-tick gain divisor: each tick sets `gain = gain / FADE_DECAY_DIVISOR`.
/// Takes a full-gain handle to the inaudibility floor in 63 ticks, about
/// 2.5 seconds of audible decay at the 40 ms interval.
pub const FADE_DECAY_DIVISOR: f32 = 1.116;

/// Gain below which a fading handle is considered silent and is released.
pub const INAUDIBILITY_FLOOR: f32 = 0.001;

/// Tunable fade behavior, serializable so a host can carry it in its own
/// configuration file. Defaults reproduce the named constants above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FadeSettings {
    /// Milliseconds between fade ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Milliseconds before the first tick after arming
    #[serde(default = "default_first_tick_delay_ms")]
    pub first_tick_delay_ms: u64,

    /// Per-tick gain divisor (> 1.0)
    #[serde(default = "default_decay_divisor")]
    pub decay_divisor: f32,

    /// Gain threshold below which a fading handle is released
    #[serde(default = "default_inaudibility_floor")]
    pub inaudibility_floor: f32,
}

fn default_tick_interval_ms() -> u64 {
    FADE_TICK_INTERVAL.as_millis() as u64
}

fn default_first_tick_delay_ms() -> u64 {
    FADE_FIRST_TICK_DELAY.as_millis() as u64
}

fn default_decay_divisor() -> f32 {
    FADE_DECAY_DIVISOR
}

fn default_inaudibility_floor() -> f32 {
    INAUDIBILITY_FLOOR
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            first_tick_delay_ms: default_first_tick_delay_ms(),
            decay_divisor: default_decay_divisor(),
            inaudibility_floor: default_inaudibility_floor(),
        }
    }
}

impl FadeSettings {
    /// Interval between fade ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Delay before the first tick after arming
    pub fn first_tick_delay(&self) -> Duration {
        Duration::from_millis(self.first_tick_delay_ms)
    }

    /// Reject settings under which a fade would never terminate.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.decay_divisor <= 1.0 {
            return Err(SettingsError::Invalid(format!(
                "decay divisor must exceed 1.0, got {}",
                self.decay_divisor
            )));
        }
        if self.inaudibility_floor <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "inaudibility floor must be positive, got {}",
                self.inaudibility_floor
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "tick interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let settings = FadeSettings::default();
        assert_eq!(settings.tick_interval(), FADE_TICK_INTERVAL);
        assert_eq!(settings.first_tick_delay(), FADE_FIRST_TICK_DELAY);
        assert_eq!(settings.decay_divisor, FADE_DECAY_DIVISOR);
        assert_eq!(settings.inaudibility_floor, INAUDIBILITY_FLOOR);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = FadeSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let deserialized: FadeSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(settings.tick_interval_ms, deserialized.tick_interval_ms);
        assert_eq!(settings.decay_divisor, deserialized.decay_divisor);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: FadeSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.tick_interval_ms, 40);
        assert_eq!(settings.first_tick_delay_ms, 50);
    }

    #[test]
    fn test_validate_rejects_non_decaying_divisor() {
        let settings = FadeSettings {
            decay_divisor: 1.0,
            ..FadeSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = FadeSettings {
            decay_divisor: 0.5,
            ..FadeSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_floor_and_interval() {
        let settings = FadeSettings {
            inaudibility_floor: 0.0,
            ..FadeSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = FadeSettings {
            tick_interval_ms: 0,
            ..FadeSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
