//! Embeddable countable timer.
//!
//! [`TimerEngine`] owns the state from `timer-core` and drives it from
//! scheduler fires. Hosts with their own clock use [`ManualScheduler`];
//! hosts that want wall-clock ticking use [`TimerHost`], which runs the
//! engine on a thread backed by [`PumpScheduler`].

mod engine;
mod error;
mod host;
mod manual;
mod pump;
mod scheduler;

pub use engine::{TimeOverFn, TimeUpdateFn, TimerBuilder, TimerEngine, TimerSnapshot};
pub use error::{Result, TimerError};
pub use host::{TimerHandle, TimerHost};
pub use manual::ManualScheduler;
pub use pump::PumpScheduler;
pub use scheduler::{Fire, ScheduleHandle, Scheduler};

pub use timer_core::{
    reduce, ConfigError, TimeOverPolicy, TimerAction, TimerConfig, TimerState, TimerStatus,
    TimerType,
};
