//! Re-armable flush timer
//!
//! A single background task sleeps until the current deadline and then runs
//! the callback. Arming again replaces the deadline instead of stacking a
//! second timer, so at most one firing is ever pending.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline timer owned by the coalescing queue
///
/// Must be created inside a tokio runtime. The driver task exits when the
/// timer is dropped.
#[derive(Debug)]
pub struct FlushTimer {
    deadline: watch::Sender<Option<Instant>>,
}

impl FlushTimer {
    /// Start the driver task; `on_fire` runs on its own task at each deadline
    pub fn spawn<F, Fut>(on_fire: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (deadline, receiver) = watch::channel(None);
        tokio::spawn(drive(receiver, on_fire));
        Self { deadline }
    }

    /// Fire after `after`, replacing any pending deadline
    pub fn arm(&self, after: Duration) {
        self.arm_at(Instant::now() + after);
    }

    /// Fire at `deadline`, replacing any pending deadline
    pub fn arm_at(&self, deadline: Instant) {
        self.deadline.send_replace(Some(deadline));
    }

    /// Drop the pending deadline, if any
    pub fn cancel(&self) {
        self.deadline.send_replace(None);
    }
}

async fn drive<F, Fut>(mut receiver: watch::Receiver<Option<Instant>>, on_fire: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let current = *receiver.borrow_and_update();

        let Some(deadline) = current else {
            if receiver.changed().await.is_err() {
                return;
            }
            continue;
        };

        tokio::select! {
            () = tokio::time::sleep_until(deadline) => {
                tokio::spawn(on_fire());
                // Stay idle until armed again
                if receiver.changed().await.is_err() {
                    return;
                }
            }
            changed = receiver.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_timer() -> (FlushTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = FlushTimer::spawn(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (timer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_deadline() {
        let (timer, fired) = counting_timer();
        timer.arm(Duration::from_millis(2000));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_pushes_deadline_out() {
        let (timer, fired) = counting_timer();
        timer.arm(Duration::from_millis(2000));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        timer.arm(Duration::from_millis(2000));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0, "first deadline must not fire");

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (timer, fired) = counting_timer();
        timer.arm(Duration::from_millis(500));
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        timer.arm(Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
