use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{
    sync::{oneshot, RwLock},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info};
use uuid::Uuid;

/// One generation of the rotating secret. Replaced whole, never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSnapshot {
    pub value: Uuid,
    pub generated_at: OffsetDateTime,
}

impl SecretSnapshot {
    fn fresh() -> Self {
        Self {
            value: Uuid::new_v4(),
            generated_at: OffsetDateTime::now_utc(),
        }
    }
}

type Slot = Arc<RwLock<Arc<SecretSnapshot>>>;

/// Read-only view of the current secret.
#[derive(Clone)]
pub struct SecretReader {
    slot: Slot,
}

impl SecretReader {
    pub async fn current(&self) -> Arc<SecretSnapshot> {
        self.slot.read().await.clone()
    }
}

/// Sole writer of the secret. `start` moves it into the rotation task.
pub struct RotatingSecretGenerator {
    slot: Slot,
}

impl RotatingSecretGenerator {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(Arc::new(SecretSnapshot::fresh()))),
        }
    }

    pub fn reader(&self) -> SecretReader {
        SecretReader {
            slot: self.slot.clone(),
        }
    }

    async fn rotate(&self) -> Arc<SecretSnapshot> {
        let next = Arc::new(SecretSnapshot::fresh());
        *self.slot.write().await = next.clone();
        next
    }

    /// Replaces the secret once per `period`, the first time one `period` from now.
    pub fn start(self, period: Duration) -> RotationTask {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            let mut stoppable = true;
            loop {
                tokio::select! {
                    res = &mut stop_rx, if stoppable => match res {
                        Ok(()) => break,
                        // handle dropped without shutdown: keep rotating
                        Err(_) => stoppable = false,
                    },
                    _ = ticker.tick() => {
                        let snapshot = self.rotate().await;
                        info!(generated_at = %snapshot.generated_at, "secret rotated");
                    }
                }
            }
            debug!("secret rotation stopped");
        });

        info!(period_secs = period.as_secs_f64(), "secret rotation started");
        RotationTask {
            stop: Some(stop_tx),
            handle,
        }
    }
}

impl Default for RotatingSecretGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the background rotation. Dropping it detaches the task.
pub struct RotationTask {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RotationTask {
    /// Stops rotating and waits for the task to exit. The last secret stays readable.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::error!(error = %e, "secret rotation task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn current_is_stable_between_rotations() {
        let generator = RotatingSecretGenerator::new();
        let reader = generator.reader();
        let a = reader.current().await;
        let b = reader.current().await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn rotate_replaces_value() {
        let generator = RotatingSecretGenerator::new();
        let reader = generator.reader();
        let before = reader.current().await;
        let rotated = generator.rotate().await;
        let after = reader.current().await;
        assert_ne!(before.value, after.value);
        assert_eq!(rotated, after);
        assert!(after.generated_at >= before.generated_at);
    }

    #[tokio::test]
    async fn background_task_rotates_on_period() {
        let generator = RotatingSecretGenerator::new();
        let reader = generator.reader();
        let task = generator.start(Duration::from_millis(100));

        let first = reader.current().await;
        assert_eq!(first, reader.current().await);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let later = reader.current().await;
        assert_ne!(first.value, later.value);

        task.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_freezes_value() {
        let generator = RotatingSecretGenerator::new();
        let reader = generator.reader();
        let task = generator.start(Duration::from_millis(20));
        task.shutdown().await;

        let frozen = reader.current().await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(frozen, reader.current().await);
    }

    #[tokio::test]
    async fn dropped_handle_keeps_rotating() {
        let generator = RotatingSecretGenerator::new();
        let reader = generator.reader();
        let first = reader.current().await;
        drop(generator.start(Duration::from_millis(20)));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_ne!(first.value, reader.current().await.value);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_see_whole_snapshots() {
        let generator = RotatingSecretGenerator::new();
        let reader = generator.reader();
        let task = generator.start(Duration::from_millis(1));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let reader = reader.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    for _ in 0..200 {
                        seen.push(reader.current().await);
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        let mut by_value = std::collections::HashMap::new();
        for r in readers {
            for snap in r.await.expect("join") {
                assert_eq!(snap.value.get_version_num(), 4);
                // a value is always paired with the instant it was generated at
                let at = by_value.entry(snap.value).or_insert(snap.generated_at);
                assert_eq!(*at, snap.generated_at);
            }
        }
        let distinct: HashSet<_> = by_value.keys().collect();
        assert!(!distinct.is_empty());

        task.shutdown().await;
    }
}
