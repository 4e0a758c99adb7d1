//! Periodic refresh driver.
//!
//! State machine: stopped → running ⇄ paused → stopped. Stop is terminal;
//! a stopped scheduler is not reusable. Ticks are delivered over a channel;
//! the receiving loop decides what a tick means (fetch + merge).
//!
//! Pausing is synchronous: delivery re-checks the flags under the same lock
//! `pause()`/`stop()` take, so once either returns no further tick fires.
//! The host feeds visibility and focus signals in; losing either suspends
//! ticking, and regaining both fires one immediate catch-up tick before the
//! interval resumes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy)]
struct Flags {
    state: PollState,
    visible: bool,
    focused: bool,
    /// One immediate tick owed after a resume/regain.
    kick: bool,
}

impl Flags {
    fn runnable(&self) -> bool {
        self.state == PollState::Running && self.visible && self.focused
    }
}

struct Shared {
    flags: Mutex<Flags>,
}

pub struct PollScheduler {
    shared: Arc<Shared>,
    control_tx: watch::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawn the scheduler in the running state. The first tick fires after
    /// one full `interval`, not immediately.
    pub fn start(interval: Duration) -> (Self, mpsc::UnboundedReceiver<()>) {
        let shared = Arc::new(Shared {
            flags: Mutex::new(Flags {
                state: PollState::Running,
                visible: true,
                focused: true,
                kick: false,
            }),
        });
        let (control_tx, control_rx) = watch::channel(());
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_loop(shared.clone(), control_rx, tick_tx, interval));

        (
            Self {
                shared,
                control_tx,
                task: Some(task),
            },
            tick_rx,
        )
    }

    pub fn state(&self) -> PollState {
        self.shared.flags.lock().state
    }

    /// Suspend ticking without losing the schedule. No tick fires after this
    /// returns.
    pub fn pause(&self) {
        self.update_flags(|flags| {
            if flags.state == PollState::Running {
                flags.state = PollState::Paused;
            }
        });
    }

    /// Resume from paused; fires one immediate tick, then the interval.
    pub fn resume(&self) {
        self.update_flags(|flags| {
            if flags.state == PollState::Paused {
                flags.state = PollState::Running;
            }
        });
    }

    /// Host visibility signal. Losing visibility suspends ticking.
    pub fn set_visible(&self, visible: bool) {
        self.update_flags(|flags| flags.visible = visible);
    }

    /// Host focus signal. Losing focus suspends ticking.
    pub fn set_focused(&self, focused: bool) {
        self.update_flags(|flags| flags.focused = focused);
    }

    /// Cancel permanently. No tick fires after this returns.
    pub fn stop(&self) {
        self.update_flags(|flags| flags.state = PollState::Stopped);
    }

    fn update_flags(&self, apply: impl FnOnce(&mut Flags)) {
        {
            let mut flags = self.shared.flags.lock();
            if flags.state == PollState::Stopped {
                return;
            }
            let was_runnable = flags.runnable();
            apply(&mut flags);
            if !was_runnable && flags.runnable() {
                flags.kick = true;
            }
        }
        let _ = self.control_tx.send(());
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    mut control_rx: watch::Receiver<()>,
    tick_tx: mpsc::UnboundedSender<()>,
    interval: Duration,
) {
    loop {
        // Wait until runnable (or exit on stop).
        loop {
            let flags = *shared.flags.lock();
            match flags.state {
                PollState::Stopped => return,
                _ if flags.runnable() => break,
                _ => {}
            }
            if control_rx.changed().await.is_err() {
                return;
            }
        }

        let kick = {
            let mut flags = shared.flags.lock();
            std::mem::take(&mut flags.kick)
        };
        if kick && !deliver(&shared, &tick_tx) {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                if !deliver(&shared, &tick_tx) {
                    return;
                }
            }
            changed = control_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                // Flags changed mid-interval; re-evaluate from the top.
            }
        }
    }
}

/// Deliver one tick iff still runnable, re-checking under the flags lock so
/// a pause()/stop() that already returned cannot be followed by a tick.
/// Returns false when the scheduler is stopped.
fn deliver(shared: &Shared, tick_tx: &mpsc::UnboundedSender<()>) -> bool {
    let flags = shared.flags.lock();
    match flags.state {
        PollState::Stopped => false,
        _ if flags.runnable() => {
            let _ = tick_tx.send(());
            true
        }
        // Paused between timer fire and delivery; drop the tick.
        _ => true,
    }
}
