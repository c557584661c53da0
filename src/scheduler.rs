/// Identifies one registration with a [`Scheduler`]. Handles are never reused
/// by the same scheduler, so a fire carrying an old handle is recognisably stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScheduleHandle(u64);

impl ScheduleHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A registration came due. The host hands it to
/// [`TimerEngine::handle_fire`](crate::TimerEngine::handle_fire).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Fire {
    pub handle: ScheduleHandle,
}

/// Periodic and deferred scheduling as seen by the engine.
///
/// Implementations only deliver [`Fire`] values; they never call into the
/// engine themselves. Jitter and drift are the implementation's concern.
pub trait Scheduler {
    /// Fire every `interval_ms` until cancelled.
    fn register_periodic(&mut self, interval_ms: u64) -> ScheduleHandle;

    /// Fire once after `delay_ms` unless cancelled first.
    fn register_once(&mut self, delay_ms: u64) -> ScheduleHandle;

    /// Cancelling an unknown or already finished handle is a no-op.
    fn cancel(&mut self, handle: ScheduleHandle);
}
