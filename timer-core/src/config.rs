use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::TimerType;

pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_STEP: i64 = 1;

/// How the engine notices that `end_time` has been reached.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeOverPolicy {
    /// Compare `time == end_time` after every change while running.
    #[default]
    ExactTick,
    /// Arm a one-shot deadline of `|end_time - time| * interval_ms` on start.
    /// The deadline does not follow `step` or manual advances.
    Deadline,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: interval must be greater than zero")]
    ZeroInterval,
    #[error("invalid configuration: step must be positive, got {0}")]
    NonPositiveStep(i64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimerConfig {
    pub initial_time: i64,
    pub interval_ms: u64,
    pub step: i64,
    pub end_time: Option<i64>,
    pub timer_type: TimerType,
    pub autostart: bool,
    pub time_over_policy: TimeOverPolicy,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            initial_time: 0,
            interval_ms: DEFAULT_INTERVAL_MS,
            step: DEFAULT_STEP,
            end_time: None,
            timer_type: TimerType::Incremental,
            autostart: false,
            time_over_policy: TimeOverPolicy::ExactTick,
        }
    }
}

impl TimerConfig {
    pub fn with_initial_time(mut self, initial_time: i64) -> Self {
        self.initial_time = initial_time;
        self
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    pub fn with_end_time(mut self, end_time: i64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_timer_type(mut self, timer_type: TimerType) -> Self {
        self.timer_type = timer_type;
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn with_time_over_policy(mut self, policy: TimeOverPolicy) -> Self {
        self.time_over_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.step <= 0 {
            return Err(ConfigError::NonPositiveStep(self.step));
        }
        Ok(())
    }

    /// The time value after one tick from `time`.
    pub fn next_tick(&self, time: i64) -> i64 {
        self.timer_type.apply(time, self.step)
    }

    /// Delay until `end_time` under [`TimeOverPolicy::Deadline`], measured
    /// from `time`. `None` when there is no target.
    pub fn deadline_ms(&self, time: i64) -> Option<u64> {
        self.end_time
            .map(|end| end.abs_diff(time).saturating_mul(self.interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimerConfig::default();
        assert_eq!(config.initial_time, 0);
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.step, 1);
        assert_eq!(config.end_time, None);
        assert_eq!(config.timer_type, TimerType::Incremental);
        assert!(!config.autostart);
        assert_eq!(config.time_over_policy, TimeOverPolicy::ExactTick);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_period_and_step() {
        let config = TimerConfig::default().with_interval_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));

        let config = TimerConfig::default().with_step(0);
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveStep(0)));

        let config = TimerConfig::default().with_step(-2);
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveStep(-2)));
    }

    #[test]
    fn test_next_tick() {
        let up = TimerConfig::default().with_step(2);
        assert_eq!(up.next_tick(4), 6);

        let down = up.with_timer_type(TimerType::Decremental);
        assert_eq!(down.next_tick(4), 2);
    }

    #[test]
    fn test_deadline_ms() {
        let config = TimerConfig::default();
        assert_eq!(config.deadline_ms(0), None);

        let config = config.with_end_time(25).with_interval_ms(500);
        assert_eq!(config.deadline_ms(5), Some(10_000));

        let config = config.with_end_time(10);
        assert_eq!(config.deadline_ms(30), Some(10_000));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let config = TimerConfig::default()
            .with_initial_time(30)
            .with_end_time(10)
            .with_timer_type(TimerType::Decremental)
            .with_time_over_policy(TimeOverPolicy::Deadline);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TimerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_missing_fields_use_defaults() {
        let parsed: TimerConfig = serde_json::from_str(r#"{"end_time": 25}"#).unwrap();
        assert_eq!(parsed, TimerConfig::default().with_end_time(25));
    }
}
