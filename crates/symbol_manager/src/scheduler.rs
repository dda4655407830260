use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::warn;
use tokio::runtime::Handle;
use tokio::time::{Instant, sleep_until};

/// Work performed once a trigger burst has settled.
pub type SettledCallback = Arc<dyn Fn() + Send + Sync>;

/// Timestamp-and-pending-flag state behind the debounce.
struct SchedulerWindow {
    last_trigger: Option<Instant>,
    pending: bool,
}

/// Trailing-edge debounce for recompute triggers.
///
/// Any number of [`UpdateScheduler::request_recompute`] calls within the
/// quiescence window coalesce into exactly one callback invocation, fired
/// only after triggers stop arriving for the full window. There is no
/// leading-edge fire: the first trigger of a burst does not run the callback
/// immediately.
pub struct UpdateScheduler {
    quiescence: Duration,
    handle: Handle,
    window: Arc<Mutex<SchedulerWindow>>,
    on_settled: SettledCallback,
}

impl UpdateScheduler {
    #[must_use]
    pub fn new(handle: Handle, quiescence: Duration, on_settled: SettledCallback) -> Self {
        Self {
            quiescence,
            handle,
            window: Arc::new(Mutex::new(SchedulerWindow {
                last_trigger: None,
                pending: false,
            })),
            on_settled,
        }
    }

    /// Records a trigger. Idempotent within a burst: if a settle task is
    /// already pending, only the trigger timestamp moves forward.
    pub fn request_recompute(&self) {
        let Ok(mut window) = self.window.lock() else {
            warn!("scheduler window lock poisoned; dropping trigger");
            return;
        };
        window.last_trigger = Some(Instant::now());
        if window.pending {
            return;
        }
        window.pending = true;
        drop(window);

        let state = Arc::clone(&self.window);
        let on_settled = Arc::clone(&self.on_settled);
        let quiescence = self.quiescence;
        self.handle.spawn(async move {
            loop {
                let deadline = {
                    let Ok(window) = state.lock() else { return };
                    window
                        .last_trigger
                        .map_or_else(Instant::now, |last| last + quiescence)
                };
                sleep_until(deadline).await;
                let Ok(mut window) = state.lock() else { return };
                let settled = window
                    .last_trigger
                    .is_none_or(|last| Instant::now() >= last + quiescence);
                if settled {
                    window.pending = false;
                    window.last_trigger = None;
                    drop(window);
                    on_settled();
                    return;
                }
                // A trigger landed while sleeping; wait out the new window.
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::runtime::Handle;
    use tokio::time::sleep;

    use super::UpdateScheduler;

    fn counting_scheduler(window: Duration) -> (UpdateScheduler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let fired = Arc::clone(&count);
        let scheduler = UpdateScheduler::new(
            Handle::current(),
            window,
            Arc::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (scheduler, count)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_window_fires_exactly_once() {
        let (scheduler, count) = counting_scheduler(Duration::from_millis(200));
        for _ in 0..5 {
            scheduler.request_recompute();
            sleep(Duration::from_millis(20)).await;
        }
        sleep(Duration::from_millis(400)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_leading_edge_fire() {
        let (scheduler, count) = counting_scheduler(Duration::from_millis(200));
        scheduler.request_recompute();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_triggers_each_fire() {
        let (scheduler, count) = counting_scheduler(Duration::from_millis(200));
        for _ in 0..3 {
            scheduler.request_recompute();
            sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_during_sleep_extends_the_window() {
        let (scheduler, count) = counting_scheduler(Duration::from_millis(200));
        scheduler.request_recompute();
        sleep(Duration::from_millis(150)).await;
        scheduler.request_recompute();
        sleep(Duration::from_millis(150)).await;
        // 300 ms since the first trigger, 150 ms since the last: still quiet.
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
