//! Pure timer state and transition logic with no scheduling dependencies.
//! Testable on host, driven by whatever event loop owns the engine.

mod config;

pub use config::{ConfigError, TimeOverPolicy, TimerConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimerStatus {
    Stopped,
    Running,
    Paused,
}

/// Direction of automatic progression.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimerType {
    #[default]
    Incremental,
    Decremental,
}

impl TimerType {
    /// Moves `time` by `delta` in this direction. Saturates at the `i64` limits.
    pub fn apply(self, time: i64, delta: i64) -> i64 {
        match self {
            TimerType::Incremental => time.saturating_add(delta),
            TimerType::Decremental => time.saturating_sub(delta),
        }
    }
}

/// Events understood by [`reduce`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerAction {
    AdvanceTime(i64),
    Pause,
    Reset(i64),
    Start(i64),
    Set(i64),
    Stop,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimerState {
    pub status: TimerStatus,
    pub time: i64,
    pub timer_type: TimerType,
}

impl TimerState {
    pub fn new(time: i64, timer_type: TimerType) -> Self {
        Self {
            status: TimerStatus::Stopped,
            time,
            timer_type,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.status == TimerStatus::Stopped
    }

    /// Applies `action` in place. See [`reduce`].
    pub fn apply(&mut self, action: TimerAction) {
        *self = reduce(*self, action);
    }
}

/// The transition function. An action whose precondition does not hold
/// leaves the state untouched.
pub fn reduce(state: TimerState, action: TimerAction) -> TimerState {
    match action {
        TimerAction::Start(initial_time) => match state.status {
            TimerStatus::Stopped => TimerState {
                status: TimerStatus::Running,
                time: initial_time,
                ..state
            },
            TimerStatus::Paused => TimerState {
                status: TimerStatus::Running,
                ..state
            },
            TimerStatus::Running => state,
        },
        TimerAction::Pause if state.is_running() => TimerState {
            status: TimerStatus::Paused,
            ..state
        },
        TimerAction::Stop if state.is_running() => TimerState {
            status: TimerStatus::Stopped,
            ..state
        },
        TimerAction::Reset(initial_time) => TimerState {
            status: TimerStatus::Stopped,
            time: initial_time,
            ..state
        },
        TimerAction::Set(new_time) if state.is_running() => TimerState {
            time: new_time,
            ..state
        },
        TimerAction::AdvanceTime(delta) => TimerState {
            time: state.timer_type.apply(state.time, delta),
            ..state
        },
        _ => state,
    }
}
