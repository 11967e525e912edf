use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::campaign::CampaignId;
use crate::schedule::fire_delay;

struct ArmedWindow {
    generation: u64,
    start: JoinHandle<()>,
    stop: JoinHandle<()>,
}

/// In-memory table of armed timers, keyed by campaign id. The single source
/// of truth for "is this campaign's job currently armed".
///
/// Each entry holds the start timer (delivery) and the stop timer
/// (guaranteed disarm) for one campaign window. Arming the same id again
/// replaces the previous pair, never appends to it, so at most one window
/// is ever live per campaign. Entries are stamped with a generation so a
/// stop timer from a replaced window can never tear down its successor.
pub struct JobRegistry {
    timers: Arc<DashMap<CampaignId, ArmedWindow>>,
    generations: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> JobRegistry {
        JobRegistry {
            timers: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Arm the start/stop timer pair for `id`, replacing any armed window.
    ///
    /// `on_fire` runs when wall-clock time reaches `fire_at`; it is detached
    /// onto its own task, so a later disarm cancels future firings only and
    /// never interrupts a delivery already in flight. `on_stop` runs at
    /// `stop_at`, after the window has removed itself from the table, and
    /// only if the window still owned its entry at that moment; a window
    /// that was disarmed or replaced never runs its stop callback.
    pub fn arm<F, S>(
        &self,
        id: CampaignId,
        fire_at: DateTime<Utc>,
        stop_at: DateTime<Utc>,
        on_fire: F,
        on_stop: S,
    ) where
        F: Future<Output = ()> + Send + 'static,
        S: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);

        // The tasks hold until the entry is inserted, otherwise a stop
        // instant in the near past could try to release the entry before it
        // exists and leave a husk behind.
        let (start_tx, start_rx) = oneshot::channel::<()>();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let start = tokio::spawn(async move {
            if start_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(fire_delay(fire_at, Utc::now())).await;
            debug!(campaign_id = %id, "start timer fired");
            tokio::spawn(on_fire);
        });

        let timers = Arc::clone(&self.timers);
        let stop = tokio::spawn(async move {
            if stop_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(fire_delay(stop_at, Utc::now())).await;
            debug!(campaign_id = %id, "stop timer fired");
            if release(&timers, id, generation) {
                on_stop.await;
            }
        });

        let armed = ArmedWindow {
            generation,
            start,
            stop,
        };
        if let Some(previous) = self.timers.insert(id, armed) {
            previous.start.abort();
            previous.stop.abort();
        }

        let _ = start_tx.send(());
        let _ = stop_tx.send(());
    }

    /// Stop and remove the window for `id`. Returns `false` (not an error)
    /// when nothing was armed.
    pub fn disarm(&self, id: CampaignId) -> bool {
        match self.timers.remove(&id) {
            Some((_, armed)) => {
                armed.start.abort();
                armed.stop.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, id: CampaignId) -> bool {
        self.timers.contains_key(&id)
    }
}

/// Remove the entry for `id` if it still belongs to `generation`,
/// cancelling a start timer that has not fired yet.
fn release(timers: &DashMap<CampaignId, ArmedWindow>, id: CampaignId, generation: u64) -> bool {
    match timers.remove_if(&id, |_, armed| armed.generation == generation) {
        Some((_, armed)) => {
            armed.start.abort();
            true
        }
        None => false,
    }
}

impl Default for JobRegistry {
    fn default() -> JobRegistry {
        JobRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;

    fn counter_future(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn window_fires_and_then_disarms_itself() {
        let registry = Arc::new(JobRegistry::new());
        let id = CampaignId::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let now = Utc::now();
        registry.arm(
            id,
            now + ChronoDuration::seconds(1),
            now + ChronoDuration::seconds(2),
            counter_future(&fired),
            counter_future(&stopped),
        );
        assert!(registry.is_armed(id));

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert!(!registry.is_armed(id));
    }

    #[tokio::test(start_paused = true)]
    async fn arming_two_campaigns_does_not_cancel_either() {
        let registry = Arc::new(JobRegistry::new());
        let first = CampaignId::new();
        let second = CampaignId::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let now = Utc::now();
        registry.arm(
            first,
            now + ChronoDuration::seconds(1),
            now + ChronoDuration::seconds(3),
            counter_future(&fired),
            counter_future(&stopped),
        );
        registry.arm(
            second,
            now + ChronoDuration::seconds(2),
            now + ChronoDuration::seconds(4),
            counter_future(&fired),
            counter_future(&stopped),
        );

        assert!(registry.is_armed(first));
        assert!(registry.is_armed(second));

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(stopped.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_previous_window() {
        let registry = Arc::new(JobRegistry::new());
        let id = CampaignId::new();
        let old_fired = Arc::new(AtomicUsize::new(0));
        let old_stopped = Arc::new(AtomicUsize::new(0));
        let new_fired = Arc::new(AtomicUsize::new(0));
        let new_stopped = Arc::new(AtomicUsize::new(0));

        let now = Utc::now();
        registry.arm(
            id,
            now + ChronoDuration::seconds(1),
            now + ChronoDuration::seconds(2),
            counter_future(&old_fired),
            counter_future(&old_stopped),
        );
        registry.arm(
            id,
            now + ChronoDuration::seconds(3),
            now + ChronoDuration::seconds(4),
            counter_future(&new_fired),
            counter_future(&new_stopped),
        );

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(old_fired.load(Ordering::SeqCst), 0);
        assert_eq!(old_stopped.load(Ordering::SeqCst), 0);
        assert_eq!(new_fired.load(Ordering::SeqCst), 1);
        assert_eq!(new_stopped.load(Ordering::SeqCst), 1);
        assert!(!registry.is_armed(id));
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_cancels_future_firings() {
        let registry = Arc::new(JobRegistry::new());
        let id = CampaignId::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let now = Utc::now();
        registry.arm(
            id,
            now + ChronoDuration::seconds(1),
            now + ChronoDuration::seconds(2),
            counter_future(&fired),
            counter_future(&stopped),
        );

        assert!(registry.disarm(id));
        assert!(!registry.is_armed(id));

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(stopped.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disarming_an_unknown_id_is_a_no_op() {
        let registry = Arc::new(JobRegistry::new());
        assert!(!registry.disarm(CampaignId::new()));
    }
}
