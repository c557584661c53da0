//! Virtual clock scheduler. Time only moves when the host says so, which makes
//! tick sequences reproducible in tests and in hosts with their own frame clock.

use std::cell::RefCell;
use std::rc::Rc;

use crate::scheduler::{Fire, ScheduleHandle, Scheduler};

struct Registration {
    handle: ScheduleHandle,
    due_ms: u64,
    period_ms: Option<u64>,
}

#[derive(Default)]
struct VirtualClock {
    now_ms: u64,
    next_id: u64,
    registrations: Vec<Registration>,
}

impl VirtualClock {
    fn register(&mut self, delay_ms: u64, period_ms: Option<u64>) -> ScheduleHandle {
        let handle = ScheduleHandle::from_raw(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            handle,
            due_ms: self.now_ms.saturating_add(delay_ms),
            period_ms,
        });
        handle
    }

    /// Pops the earliest registration due at or before `until_ms`. Ties go to
    /// the older registration. Periodic registrations are re-armed.
    fn pop_due(&mut self, until_ms: u64) -> Option<Fire> {
        let idx = self
            .registrations
            .iter()
            .enumerate()
            .filter(|(_, r)| r.due_ms <= until_ms)
            .min_by_key(|(_, r)| (r.due_ms, r.handle.raw()))
            .map(|(idx, _)| idx)?;

        let due_ms = self.registrations[idx].due_ms;
        self.now_ms = due_ms;
        let handle = self.registrations[idx].handle;
        match self.registrations[idx].period_ms {
            Some(period) => self.registrations[idx].due_ms = due_ms.saturating_add(period),
            None => {
                self.registrations.remove(idx);
            }
        }
        Some(Fire { handle })
    }
}

/// Cloning shares the clock, so the host can keep one copy while the engine
/// owns another.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<VirtualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.borrow().now_ms
    }

    /// Number of live registrations.
    pub fn active_count(&self) -> usize {
        self.clock.borrow().registrations.len()
    }

    /// Moves the clock forward by `ms`, handing every fire that comes due to
    /// `deliver` in timestamp order. The clock is not borrowed while `deliver`
    /// runs, so it may register or cancel.
    pub fn run_for<F>(&self, ms: u64, mut deliver: F)
    where
        F: FnMut(Fire),
    {
        let until_ms = self.now_ms().saturating_add(ms);
        loop {
            let fire = self.clock.borrow_mut().pop_due(until_ms);
            match fire {
                Some(fire) => deliver(fire),
                None => break,
            }
        }
        self.clock.borrow_mut().now_ms = until_ms;
    }
}

impl Scheduler for ManualScheduler {
    fn register_periodic(&mut self, interval_ms: u64) -> ScheduleHandle {
        self.clock.borrow_mut().register(interval_ms, Some(interval_ms))
    }

    fn register_once(&mut self, delay_ms: u64) -> ScheduleHandle {
        self.clock.borrow_mut().register(delay_ms, None)
    }

    fn cancel(&mut self, handle: ScheduleHandle) {
        self.clock
            .borrow_mut()
            .registrations
            .retain(|r| r.handle != handle);
    }
}
