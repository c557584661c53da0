//! A ready-made host loop: one thread owns the engine and serialises view
//! commands and pump fires, so the engine itself never needs locking.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use timer_core::TimerConfig;

use crate::engine::{TimeOverFn, TimeUpdateFn, TimerBuilder, TimerEngine, TimerSnapshot};
use crate::error::{Result, TimerError};
use crate::pump::PumpScheduler;
use crate::scheduler::Fire;

enum HostOp {
    Start,
    Pause,
    Reset,
    AdvanceTime(i64),
    UpdateConfig(TimerConfig, Sender<Result<()>>),
    SetOnTimeUpdate(Option<TimeUpdateFn>),
    SetOnTimeOver(Option<TimeOverFn>),
    Snapshot(Sender<TimerSnapshot>),
    Quit,
}

/// Cloneable, `Send` control surface for a [`TimerHost`].
///
/// Observers run on the host thread. An observer must not call `snapshot`
/// or `update_config` on a handle to its own host: both wait for a reply
/// from the loop that is running the observer, and never get one.
#[derive(Clone)]
pub struct TimerHandle {
    ops: Sender<HostOp>,
}

impl TimerHandle {
    fn send(&self, op: HostOp) -> Result<()> {
        self.ops.send(op).map_err(|_| TimerError::HostDisconnected)
    }

    pub fn start(&self) -> Result<()> {
        self.send(HostOp::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(HostOp::Pause)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(HostOp::Reset)
    }

    pub fn advance_time(&self, delta: i64) -> Result<()> {
        self.send(HostOp::AdvanceTime(delta))
    }

    pub fn update_config(&self, config: TimerConfig) -> Result<()> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send(HostOp::UpdateConfig(config, reply_tx))?;
        reply_rx.recv().map_err(|_| TimerError::HostDisconnected)?
    }

    /// `f` runs on the host thread; see the note on [`TimerHandle`].
    pub fn set_on_time_update(&self, f: impl FnMut(i64) + Send + 'static) -> Result<()> {
        self.send(HostOp::SetOnTimeUpdate(Some(Box::new(f))))
    }

    pub fn clear_on_time_update(&self) -> Result<()> {
        self.send(HostOp::SetOnTimeUpdate(None))
    }

    /// `f` runs on the host thread; see the note on [`TimerHandle`].
    pub fn set_on_time_over(&self, f: impl FnMut() + Send + 'static) -> Result<()> {
        self.send(HostOp::SetOnTimeOver(Some(Box::new(f))))
    }

    pub fn clear_on_time_over(&self) -> Result<()> {
        self.send(HostOp::SetOnTimeOver(None))
    }

    /// Waits for the host to process everything queued before it.
    pub fn snapshot(&self) -> Result<TimerSnapshot> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send(HostOp::Snapshot(reply_tx))?;
        reply_rx.recv().map_err(|_| TimerError::HostDisconnected)
    }
}

/// Runs a [`TimerEngine`] on its own thread, ticking in wall-clock time.
/// Dropping the host stops the thread and cancels every pump.
///
/// Observers from the builder run on the host thread too. They may call the
/// non-blocking [`TimerHandle`] methods (`start`, `pause`, `reset`,
/// `advance_time`); a blocking call (`snapshot`, `update_config`) from an
/// observer deadlocks the host.
pub struct TimerHost {
    handle: TimerHandle,
    thread: Option<JoinHandle<()>>,
}

impl TimerHost {
    /// Builds the engine on the host thread. Configuration errors are
    /// returned here, before any pump exists.
    pub fn spawn(builder: TimerBuilder) -> Result<Self> {
        let (ops_tx, ops_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let thread = thread::spawn(move || {
            let (fires_tx, fires_rx) = crossbeam_channel::unbounded();
            match builder.build(PumpScheduler::new(fires_tx)) {
                Ok(engine) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        host_loop(engine, ops_rx, fires_rx);
                    }
                }
                Err(e) => {
                    ready_tx.send(Err(e)).ok();
                }
            }
        });

        let ready = ready_rx.recv().map_err(|_| TimerError::HostDisconnected);
        match ready {
            Ok(Ok(())) => Ok(Self {
                handle: TimerHandle { ops: ops_tx },
                thread: Some(thread),
            }),
            Ok(Err(e)) | Err(e) => {
                thread.join().ok();
                Err(e)
            }
        }
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.handle.send(HostOp::Quit).ok();
            if thread.join().is_err() {
                log::error!("timer host thread panicked");
            }
        }
    }
}

impl Drop for TimerHost {
    fn drop(&mut self) {
        self.stop();
    }
}

fn host_loop(
    mut engine: TimerEngine<PumpScheduler>,
    ops: Receiver<HostOp>,
    fires: Receiver<Fire>,
) {
    log::debug!("timer host running");
    loop {
        select! {
            recv(ops) -> op => match op {
                Ok(HostOp::Quit) | Err(_) => break,
                Ok(op) => handle_op(&mut engine, op),
            },
            recv(fires) -> fire => match fire {
                Ok(fire) => engine.handle_fire(fire),
                Err(_) => {
                    log::error!("pump channel closed");
                    break;
                }
            },
        }
    }
    log::debug!("timer host exiting at {}", engine.time());
}

fn handle_op(engine: &mut TimerEngine<PumpScheduler>, op: HostOp) {
    match op {
        HostOp::Start => engine.start(),
        HostOp::Pause => engine.pause(),
        HostOp::Reset => engine.reset(),
        HostOp::AdvanceTime(delta) => engine.advance_time(delta),
        HostOp::UpdateConfig(config, reply) => {
            reply.send(engine.update_config(config)).ok();
        }
        HostOp::SetOnTimeUpdate(Some(f)) => engine.set_on_time_update(f),
        HostOp::SetOnTimeUpdate(None) => engine.clear_on_time_update(),
        HostOp::SetOnTimeOver(Some(f)) => engine.set_on_time_over(f),
        HostOp::SetOnTimeOver(None) => engine.clear_on_time_over(),
        HostOp::Snapshot(reply) => {
            reply.send(engine.snapshot()).ok();
        }
        HostOp::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use timer_core::{ConfigError, TimerStatus};

    #[test]
    fn test_spawn_rejects_invalid_config() {
        let builder = TimerBuilder::new(TimerConfig::default().with_interval_ms(0));
        let err = TimerHost::spawn(builder).err();
        assert_eq!(
            err,
            Some(TimerError::InvalidConfiguration(ConfigError::ZeroInterval))
        );
    }

    #[test]
    fn test_host_runs_to_end_time() {
        let (over_tx, over_rx) = crossbeam_channel::bounded(1);
        let builder = TimerBuilder::new(
            TimerConfig::default().with_interval_ms(10).with_end_time(3),
        )
        .on_time_over(move || {
            over_tx.try_send(()).ok();
        });
        let host = TimerHost::spawn(builder).unwrap();
        let timer = host.handle();

        timer.start().unwrap();
        over_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let snapshot = timer.snapshot().unwrap();
        assert_eq!(snapshot.time, 3);
        assert_eq!(snapshot.status, TimerStatus::Stopped);
        assert!(snapshot.is_time_over);
        host.shutdown();
    }

    #[test]
    fn test_host_commands_apply_in_order() {
        let host = TimerHost::spawn(TimerBuilder::new(
            TimerConfig::default().with_interval_ms(60_000),
        ))
        .unwrap();
        let timer = host.handle();

        timer.advance_time(4).unwrap();
        timer.start().unwrap();
        timer.pause().unwrap();
        let snapshot = timer.snapshot().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Paused);
        assert_eq!(snapshot.time, 0);

        timer.advance_time(6).unwrap();
        timer
            .update_config(TimerConfig::default().with_initial_time(9))
            .unwrap();
        assert_eq!(timer.snapshot().unwrap().time, 6);

        timer.reset().unwrap();
        assert_eq!(timer.snapshot().unwrap().time, 9);
    }

    #[test]
    fn test_handle_fails_after_shutdown() {
        let host = TimerHost::spawn(TimerBuilder::new(TimerConfig::default())).unwrap();
        let timer = host.handle();
        host.shutdown();

        assert_eq!(timer.start(), Err(TimerError::HostDisconnected));
        assert_eq!(
            timer.update_config(TimerConfig::default().with_step(0)),
            Err(TimerError::HostDisconnected)
        );
    }

    #[test]
    fn test_update_config_error_reaches_caller() {
        let host = TimerHost::spawn(TimerBuilder::new(TimerConfig::default())).unwrap();
        let timer = host.handle();
        assert_eq!(
            timer.update_config(TimerConfig::default().with_step(0)),
            Err(TimerError::InvalidConfiguration(ConfigError::NonPositiveStep(0)))
        );
    }
}
