//! Fixed-period refresh of a single game while its view is open.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::{mpsc, Notify},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    api::{ApiClient, ApiError},
    models::Game,
    session::Session,
};

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Result of one fetch, tagged with the subscription that produced it.
#[derive(Debug)]
pub struct PollUpdate {
    /// Identifies the poller; stale ids belong to a closed view.
    pub subscription: u64,
    /// Fetched game or the failure of this tick.
    pub result: Result<Game, ApiError>,
}

/// Owner of a running poll task. Dropping it stops the task.
#[derive(Debug)]
pub struct PollHandle {
    subscription: u64,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Id carried by every update from this poller.
    pub fn subscription(&self) -> u64 {
        self.subscription
    }

    /// Request one fetch now, in addition to the periodic ones.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stop polling.
    pub fn stop(self) {}
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(subscription = self.subscription, "Poller stopped");
    }
}

/// Spawns poll tasks.
pub struct GamePoller;

impl GamePoller {
    /// Poll `GET /game/{id}` every `period`, starting immediately.
    pub fn for_game(
        client: ApiClient,
        session: Session,
        game_id: String,
        period: Duration,
        sender: mpsc::Sender<PollUpdate>,
    ) -> PollHandle {
        Self::spawn(
            period,
            move || {
                let client = client.clone();
                let session = session.clone();
                let game_id = game_id.clone();
                async move { client.game(&session, &game_id).await }
            },
            sender,
        )
    }

    /// Run `fetch` on every tick and on every [`PollHandle::refresh`].
    ///
    /// Failures are logged and delivered; the next tick retries without backoff.
    /// The task ends when the handle is dropped or the receiver goes away.
    pub fn spawn<F, Fut>(period: Duration, fetch: F, sender: mpsc::Sender<PollUpdate>) -> PollHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Game, ApiError>> + Send + 'static,
    {
        let subscription = NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed);
        let refresh = Arc::new(Notify::new());
        let wake = refresh.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }

                let result = fetch().await;
                if let Err(err) = &result {
                    warn!(subscription, %err, "Game refresh failed");
                }
                if sender.send(PollUpdate { subscription, result }).await.is_err() {
                    break;
                }
            }
        });

        debug!(subscription, period_ms = period.as_millis() as u64, "Poller started");
        PollHandle {
            subscription,
            refresh,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameStatus;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::timeout;

    fn game(status: GameStatus) -> Game {
        Game {
            id: "g1".to_string(),
            status,
            player1_id: Some("u1".to_string()),
            player2_id: None,
            player_to_move_id: None,
            ships_coord: Vec::new(),
            moves: Vec::new(),
        }
    }

    async fn next(rx: &mut mpsc::Receiver<PollUpdate>) -> Result<PollUpdate> {
        timeout(Duration::from_secs(2), rx.recv())
            .await?
            .ok_or_else(|| anyhow!("poller closed"))
    }

    #[tokio::test]
    async fn ticks_pick_up_status_changes() -> Result<()> {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(8);
        let handle = GamePoller::spawn(
            Duration::from_millis(20),
            move || {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Ok(game(GameStatus::Created))
                    } else {
                        Ok(game(GameStatus::MapConfig))
                    }
                }
            },
            tx,
        );

        let first = next(&mut rx).await?;
        assert_eq!(first.subscription, handle.subscription());
        assert_eq!(first.result?.status, GameStatus::Created);
        let second = next(&mut rx).await?;
        assert_eq!(second.result?.status, GameStatus::MapConfig);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_fetches_out_of_band() -> Result<()> {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = GamePoller::spawn(
            Duration::from_secs(3600),
            || async { Ok(game(GameStatus::Active)) },
            tx,
        );

        next(&mut rx).await?;
        handle.refresh();
        let update = next(&mut rx).await?;
        assert_eq!(update.result?.status, GameStatus::Active);
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_retried_on_next_tick() -> Result<()> {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(8);
        let _handle = GamePoller::spawn(
            Duration::from_millis(20),
            move || {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(ApiError::MissingToken)
                    } else {
                        Ok(game(GameStatus::Active))
                    }
                }
            },
            tx,
        );

        assert!(next(&mut rx).await?.result.is_err());
        assert!(next(&mut rx).await?.result.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn dropping_handle_stops_updates() -> Result<()> {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = GamePoller::spawn(
            Duration::from_millis(10),
            || async { Ok(game(GameStatus::Created)) },
            tx,
        );
        next(&mut rx).await?;
        handle.stop();

        let drained = timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok(), "receiver should close once the task is aborted");
        Ok(())
    }

    #[tokio::test]
    async fn subscriptions_are_distinct() {
        let (tx, _rx) = mpsc::channel(1);
        let first = GamePoller::spawn(
            Duration::from_secs(3600),
            || async { Ok(game(GameStatus::Created)) },
            tx.clone(),
        );
        let second = GamePoller::spawn(
            Duration::from_secs(3600),
            || async { Ok(game(GameStatus::Created)) },
            tx,
        );
        assert_ne!(first.subscription(), second.subscription());
    }
}
