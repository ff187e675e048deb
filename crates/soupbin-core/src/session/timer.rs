//! Resettable timers backing the heartbeat and inactivity duties.
//!
//! Each timer is a small task parked on [`tokio::sync::Notify`] between
//! arming periods. `reset` bumps the deadline forward and wakes the task;
//! the task only emits its event if the deadline it is sleeping toward is
//! still current when the sleep completes (a `reset` racing in at the exact
//! instant of natural expiry loses the race deterministically: the task
//! simply recomputes and waits again).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::env::Environment;

struct TimerState<I> {
    armed: bool,
    deadline: I,
}

/// A handle used by the owning session to (re)arm a background timer.
pub struct ResettableTimer<E: Environment> {
    state: Arc<Mutex<TimerState<E::Instant>>>,
    notify: Arc<Notify>,
}

impl<E: Environment> Clone for ResettableTimer<E> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state), notify: Arc::clone(&self.notify) }
    }
}

impl<E: Environment> ResettableTimer<E> {
    /// Re-arm the timer to fire `interval` from now, waking the waiting task.
    #[allow(clippy::expect_used)]
    pub fn reset(&self, env: &E, interval: Duration) {
        let mut state = self.state.lock().expect("invariant: timer mutex is never held across await");
        state.armed = true;
        state.deadline = env.now() + interval;
        drop(state);
        self.notify.notify_one();
    }
}

/// Spawn a timer task. On natural expiry it invokes `on_fire`; the task then
/// parks until the next `reset`. Returns the handle used to arm/rearm it,
/// plus an abort handle for the task itself.
///
/// `on_fire` returning `false` ends the task (used to stop cleanly when the
/// session's event channel has been dropped).
pub fn spawn<E, F>(
    env: E,
    initial_interval: Duration,
    mut on_fire: F,
) -> (ResettableTimer<E>, tokio::task::AbortHandle)
where
    E: Environment,
    F: FnMut() -> bool + Send + 'static,
{
    let state = Arc::new(Mutex::new(TimerState { armed: true, deadline: env.now() + initial_interval }));
    let notify = Arc::new(Notify::new());
    let handle = ResettableTimer { state: Arc::clone(&state), notify: Arc::clone(&notify) };

    let abort_handle = tokio::spawn(async move {
        loop {
            #[allow(clippy::expect_used)]
            let (armed, deadline) = {
                let s = state.lock().expect("invariant: timer mutex is never held across await");
                (s.armed, s.deadline)
            };

            if !armed {
                notify.notified().await;
                continue;
            }

            let now = env.now();
            let wait = if deadline > now { deadline - now } else { Duration::ZERO };

            tokio::select! {
                () = env.sleep(wait) => {
                    #[allow(clippy::expect_used)]
                    let still_due = {
                        let mut s = state.lock().expect("invariant: timer mutex is never held across await");
                        let due = s.armed && s.deadline <= env.now();
                        if due {
                            s.armed = false;
                        }
                        due
                    };
                    if still_due && !on_fire() {
                        return;
                    }
                }
                () = notify.notified() => {}
            }
        }
    })
    .abort_handle();

    (handle, abort_handle)
}
