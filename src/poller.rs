use std::time::Duration;

use tokio::{
    sync::{
        mpsc,
        oneshot,
    },
    task::JoinHandle,
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::{
    api::{
        BingoApi,
        GameId,
        UserId,
    },
    session::Reply,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Background `game_status` poll for one game. Dropping the handle cancels
/// the task.
pub struct StatusPoller {
    game_id: GameId,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    pub fn spawn<A: BingoApi>(
        api: A,
        user_id: UserId,
        game_id: GameId,
        every: Duration,
        replies: mpsc::UnboundedSender<Reply>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(poll_status(
            api,
            user_id,
            game_id.clone(),
            every.max(MIN_POLL_INTERVAL),
            replies,
            shutdown_rx,
        ));
        info!(%game_id, ?every, "status polling started");
        Self {
            game_id,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// The task ended on its own (winner reported or receiver gone).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
            self.handle.abort();
            info!(game_id = %self.game_id, "status polling stopped");
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn poll_status<A: BingoApi>(
    api: A,
    user_id: UserId,
    game_id: GameId,
    every: Duration,
    replies: mpsc::UnboundedSender<Reply>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let status = match api.game_status(&user_id, &game_id).await {
                    Ok(status) => status,
                    Err(err) => {
                        warn!(?err, %game_id, "status poll failed");
                        continue;
                    }
                };
                let finished = status.is_won();
                let reply = Reply::StatusPolled {
                    game_id: game_id.clone(),
                    status,
                };
                if replies.send(reply).is_err() {
                    debug!(%game_id, "status receiver dropped");
                    break;
                }
                if finished {
                    info!(%game_id, "game finished, polling ends");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        api::GameState,
        test_helpers::{
            FakeApi,
            FakeFailure,
            game_status,
        },
    };

    fn user() -> UserId {
        UserId::new("42")
    }

    #[tokio::test(start_paused = true)]
    async fn spawn__fetches_immediately_then_every_interval() {
        // given
        let api = FakeApi::default();
        api.always_game_status(Ok(game_status(GameState::Started)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        let poller = StatusPoller::spawn(
            api.clone(),
            user(),
            GameId::new("g1"),
            Duration::from_secs(5),
            tx,
        );
        let first = rx.recv().await;
        time::sleep(Duration::from_secs(5)).await;
        let second = rx.recv().await;
        poller.stop();
        time::sleep(Duration::from_secs(30)).await;

        // then
        assert!(matches!(first, Some(Reply::StatusPolled { .. })));
        assert!(matches!(second, Some(Reply::StatusPolled { .. })));
        assert!(rx.try_recv().is_err());
        assert_eq!(api.count_calls("game_status"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn__poll_failures_are_not_forwarded() {
        // given
        let api = FakeApi::default();
        api.queue_game_status(Err(FakeFailure::Unavailable));
        api.always_game_status(Ok(game_status(GameState::Waiting)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        let _poller = StatusPoller::spawn(
            api.clone(),
            user(),
            GameId::new("g1"),
            Duration::from_secs(5),
            tx,
        );
        let reply = rx.recv().await;

        // then
        let Some(Reply::StatusPolled { status, .. }) = reply else {
            panic!("expected a status reply, got {reply:?}");
        };
        assert_eq!(status.state, GameState::Waiting);
        assert_eq!(api.count_calls("game_status"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn__ends_after_forwarding_a_winner() {
        // given
        let api = FakeApi::default();
        let mut finished = game_status(GameState::Finished);
        finished.winner_id = Some(user());
        api.always_game_status(Ok(finished));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        let poller = StatusPoller::spawn(
            api.clone(),
            user(),
            GameId::new("g1"),
            Duration::from_secs(5),
            tx,
        );
        let reply = rx.recv().await;
        time::sleep(Duration::from_secs(20)).await;

        // then
        assert!(matches!(reply, Some(Reply::StatusPolled { .. })));
        assert!(poller.is_finished());
        assert_eq!(api.count_calls("game_status"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop__cancels_polling() {
        // given
        let api = FakeApi::default();
        api.always_game_status(Ok(game_status(GameState::Started)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let poller = StatusPoller::spawn(
            api.clone(),
            user(),
            GameId::new("g1"),
            Duration::from_secs(5),
            tx,
        );
        let _ = rx.recv().await;

        // when
        drop(poller);
        time::sleep(Duration::from_secs(60)).await;

        // then
        assert_eq!(api.count_calls("game_status"), 1);
        assert!(rx.recv().await.is_none());
    }
}
