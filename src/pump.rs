//! Wall-clock scheduler. Each registration runs a small pump thread that
//! sleeps on its shutdown channel and posts a [`Fire`] to the host's queue
//! whenever the sleep times out.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::scheduler::{Fire, ScheduleHandle, Scheduler};

struct Pump {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

pub struct PumpScheduler {
    fires: Sender<Fire>,
    next_id: u64,
    pumps: HashMap<ScheduleHandle, Pump>,
}

impl PumpScheduler {
    /// Fires are posted to `fires`; the host drains the matching receiver.
    pub fn new(fires: Sender<Fire>) -> Self {
        Self {
            fires,
            next_id: 0,
            pumps: HashMap::new(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.pumps.len()
    }

    fn spawn(&mut self, period: Duration, repeat: bool) -> ScheduleHandle {
        let handle = ScheduleHandle::from_raw(self.next_id);
        self.next_id += 1;

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let fires = self.fires.clone();
        let thread = thread::spawn(move || {
            pump_thread(handle, period, repeat, shutdown_rx, fires);
        });
        self.pumps.insert(
            handle,
            Pump {
                shutdown: shutdown_tx,
                thread,
            },
        );
        log::debug!("pump {} started, {:?} repeat={}", handle.raw(), period, repeat);
        handle
    }
}

fn stop_pump(handle: ScheduleHandle, pump: Pump) {
    // Dropping the sender wakes the pump with Disconnected.
    drop(pump.shutdown);
    if pump.thread.join().is_err() {
        log::error!("pump {} panicked", handle.raw());
    }
}

impl Scheduler for PumpScheduler {
    fn register_periodic(&mut self, interval_ms: u64) -> ScheduleHandle {
        self.spawn(Duration::from_millis(interval_ms), true)
    }

    fn register_once(&mut self, delay_ms: u64) -> ScheduleHandle {
        self.spawn(Duration::from_millis(delay_ms), false)
    }

    /// Returns once the pump thread has exited, so no further fire for
    /// `handle` is posted after this call.
    fn cancel(&mut self, handle: ScheduleHandle) {
        if let Some(pump) = self.pumps.remove(&handle) {
            stop_pump(handle, pump);
            log::debug!("pump {} cancelled", handle.raw());
        }
    }
}

impl Drop for PumpScheduler {
    fn drop(&mut self) {
        for (handle, pump) in self.pumps.drain() {
            stop_pump(handle, pump);
        }
    }
}

/// Deadlines advance by whole periods from the first one, so a slow host does
/// not push later fires back.
fn pump_thread(
    handle: ScheduleHandle,
    period: Duration,
    repeat: bool,
    shutdown: Receiver<()>,
    fires: Sender<Fire>,
) {
    let mut next = Instant::now() + period;
    loop {
        match shutdown.recv_deadline(next) {
            Err(RecvTimeoutError::Timeout) => {
                if fires.send(Fire { handle }).is_err() {
                    log::warn!("pump {} lost its host", handle.raw());
                    break;
                }
                if !repeat {
                    break;
                }
                next += period;
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLACK: Duration = Duration::from_millis(500);

    #[test]
    fn test_periodic_pump_fires_repeatedly() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pumps = PumpScheduler::new(tx);
        let handle = pumps.register_periodic(20);

        for _ in 0..3 {
            let fire = rx.recv_timeout(SLACK).unwrap();
            assert_eq!(fire.handle, handle);
        }
        pumps.cancel(handle);
        assert_eq!(pumps.active_count(), 0);
    }

    #[test]
    fn test_once_pump_fires_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pumps = PumpScheduler::new(tx);
        let handle = pumps.register_once(10);

        assert_eq!(rx.recv_timeout(SLACK).unwrap().handle, handle);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_cancel_stops_fires() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pumps = PumpScheduler::new(tx);
        let handle = pumps.register_periodic(10);
        rx.recv_timeout(SLACK).unwrap();

        pumps.cancel(handle);
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_drop_joins_pumps() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pumps = PumpScheduler::new(tx);
        pumps.register_periodic(10);
        pumps.register_once(10_000);
        drop(pumps);

        while rx.try_recv().is_ok() {}
        // Every sender is gone once the pumps have exited.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(rx.is_empty());
    }
}
