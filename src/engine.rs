use timer_core::{
    reduce, TimeOverPolicy, TimerAction, TimerConfig, TimerState, TimerStatus,
};

use crate::error::Result;
use crate::manual::ManualScheduler;
use crate::scheduler::{Fire, ScheduleHandle, Scheduler};

pub type TimeUpdateFn = Box<dyn FnMut(i64) + Send>;
pub type TimeOverFn = Box<dyn FnMut() + Send>;

/// What the view layer reads back.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub time: i64,
    pub is_time_over: bool,
}

impl TimerSnapshot {
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }
}

pub struct TimerBuilder {
    config: TimerConfig,
    on_time_update: Option<TimeUpdateFn>,
    on_time_over: Option<TimeOverFn>,
}

impl TimerBuilder {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            on_time_update: None,
            on_time_over: None,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn on_time_update(mut self, f: impl FnMut(i64) + Send + 'static) -> Self {
        self.on_time_update = Some(Box::new(f));
        self
    }

    pub fn on_time_over(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_time_over = Some(Box::new(f));
        self
    }

    /// Validates the configuration, reports the initial time to
    /// `on_time_update`, and starts right away when `autostart` is set.
    pub fn build<S: Scheduler>(self, scheduler: S) -> Result<TimerEngine<S>> {
        self.config.validate()?;

        let mut engine = TimerEngine {
            state: TimerState::new(self.config.initial_time, self.config.timer_type),
            config: self.config,
            scheduler,
            ticker: None,
            deadline: None,
            last_reported: None,
            time_over: false,
            on_time_update: self.on_time_update,
            on_time_over: self.on_time_over,
        };
        engine.report_time();
        if engine.config.autostart {
            engine.start();
        }
        Ok(engine)
    }
}

/// Owns one timer's state and its scheduler registrations.
///
/// Every mutation goes through [`reduce`]. The engine never blocks; the host
/// calls the operations below and forwards each scheduler [`Fire`] to
/// [`handle_fire`](Self::handle_fire).
pub struct TimerEngine<S: Scheduler> {
    config: TimerConfig,
    state: TimerState,
    scheduler: S,
    ticker: Option<ScheduleHandle>,
    deadline: Option<ScheduleHandle>,
    last_reported: Option<i64>,
    time_over: bool,
    on_time_update: Option<TimeUpdateFn>,
    on_time_over: Option<TimeOverFn>,
}

impl<S: Scheduler> TimerEngine<S> {
    pub fn new(config: TimerConfig, scheduler: S) -> Result<Self> {
        TimerBuilder::new(config).build(scheduler)
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn time(&self) -> i64 {
        self.state.time
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// True after a run completed on its target, until the next start or reset.
    pub fn is_time_over(&self) -> bool {
        self.time_over
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            status: self.state.status,
            time: self.state.time,
            is_time_over: self.time_over,
        }
    }

    /// Starts from Stopped (reseeding from `initial_time`) or resumes from
    /// Paused. No-op while running.
    pub fn start(&mut self) {
        if self.state.is_running() {
            log::debug!("start ignored, timer already running at {}", self.state.time);
            return;
        }
        let from = self.state.status;
        self.dispatch(TimerAction::Start(self.config.initial_time));
        self.time_over = false;
        log::debug!("timer started from {:?} at {}", from, self.state.time);
        self.report_time();

        if self.end_reached() {
            self.complete();
            return;
        }
        self.arm();
    }

    pub fn pause(&mut self) {
        if !self.state.is_running() {
            return;
        }
        self.disarm();
        self.dispatch(TimerAction::Pause);
        log::debug!("timer paused at {}", self.state.time);
    }

    /// Back to Stopped at `initial_time`, from any status.
    pub fn reset(&mut self) {
        self.disarm();
        self.dispatch(TimerAction::Reset(self.config.initial_time));
        self.time_over = false;
        log::debug!("timer reset to {}", self.state.time);
        self.report_time();
    }

    /// Moves `time` by `delta` in the timer's direction, whatever the status.
    /// Scheduling is untouched. Landing exactly on `end_time` while running
    /// completes the run immediately under [`TimeOverPolicy::ExactTick`].
    pub fn advance_time(&mut self, delta: i64) {
        self.dispatch(TimerAction::AdvanceTime(delta));
        self.report_time();
        if self.end_reached() {
            self.complete();
        }
    }

    /// Replaces the configuration without touching `time` or status. A new
    /// `interval_ms` takes effect on the running ticker right away.
    pub fn update_config(&mut self, config: TimerConfig) -> Result<()> {
        config.validate()?;
        let interval_changed = config.interval_ms != self.config.interval_ms;
        self.state.timer_type = config.timer_type;
        self.config = config;

        if interval_changed && self.state.is_running() {
            if let Some(ticker) = self.ticker.take() {
                self.scheduler.cancel(ticker);
            }
            self.ticker = Some(self.scheduler.register_periodic(self.config.interval_ms));
            log::debug!("ticker re-armed at {}ms", self.config.interval_ms);
        }
        Ok(())
    }

    pub fn set_on_time_update(&mut self, f: impl FnMut(i64) + Send + 'static) {
        self.on_time_update = Some(Box::new(f));
    }

    pub fn clear_on_time_update(&mut self) {
        self.on_time_update = None;
    }

    pub fn set_on_time_over(&mut self, f: impl FnMut() + Send + 'static) {
        self.on_time_over = Some(Box::new(f));
    }

    pub fn clear_on_time_over(&mut self) {
        self.on_time_over = None;
    }

    /// Entry point for scheduler fires. Fires from cancelled registrations
    /// are dropped.
    pub fn handle_fire(&mut self, fire: Fire) {
        if self.ticker == Some(fire.handle) {
            self.tick();
        } else if self.deadline == Some(fire.handle) {
            self.deadline = None;
            log::debug!("deadline reached at {}", self.state.time);
            self.complete();
        } else {
            log::trace!("dropping stale fire {:?}", fire.handle);
        }
    }

    fn tick(&mut self) {
        if !self.state.is_running() {
            return;
        }
        let next = self.config.next_tick(self.state.time);
        self.dispatch(TimerAction::Set(next));
        self.report_time();
        if self.end_reached() {
            self.complete();
        }
    }

    fn dispatch(&mut self, action: TimerAction) {
        self.state = reduce(self.state, action);
    }

    fn end_reached(&self) -> bool {
        self.config.time_over_policy == TimeOverPolicy::ExactTick
            && self.state.is_running()
            && self.config.end_time == Some(self.state.time)
    }

    /// Stops the run on its target and notifies once.
    fn complete(&mut self) {
        if !self.state.is_running() {
            return;
        }
        self.disarm();
        self.dispatch(TimerAction::Stop);
        self.time_over = true;
        log::info!("timer reached its end at {}", self.state.time);
        if let Some(on_time_over) = self.on_time_over.as_mut() {
            on_time_over();
        }
    }

    fn arm(&mut self) {
        self.disarm();
        self.ticker = Some(self.scheduler.register_periodic(self.config.interval_ms));
        if self.config.time_over_policy == TimeOverPolicy::Deadline {
            if let Some(delay_ms) = self.config.deadline_ms(self.state.time) {
                self.deadline = Some(self.scheduler.register_once(delay_ms));
                log::debug!("deadline armed for {}ms", delay_ms);
            }
        }
    }

    fn disarm(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            self.scheduler.cancel(ticker);
        }
        if let Some(deadline) = self.deadline.take() {
            self.scheduler.cancel(deadline);
        }
    }

    fn report_time(&mut self) {
        let time = self.state.time;
        if self.last_reported == Some(time) {
            return;
        }
        self.last_reported = Some(time);
        if let Some(on_time_update) = self.on_time_update.as_mut() {
            on_time_update(time);
        }
    }
}

impl TimerEngine<ManualScheduler> {
    /// Advances the virtual clock, feeding every due fire back into this engine.
    pub fn run_for(&mut self, ms: u64) {
        let clock = self.scheduler.clone();
        clock.run_for(ms, |fire| self.handle_fire(fire));
    }
}

impl<S: Scheduler> Drop for TimerEngine<S> {
    fn drop(&mut self) {
        self.disarm();
    }
}
