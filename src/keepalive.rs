//! Liveness probing for the configuration phase.
//!
//! Two tasks run per connection: a sender that emits a keepalive
//! probe with a random id on a fixed interval, and a monitor that
//! watches for probes that were never answered.

use crate::{
    protocol::packet::{server::configuration, side, state},
    stream::PacketStream,
};
use parking_lot::Mutex;
use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};
use tokio::{
    select,
    sync::mpsc,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SEND_INTERVAL: Duration = Duration::from_secs(5);
const MUST_RESPOND_IN: Duration = Duration::from_secs(5);
const MONITOR_INTERVAL: Duration = Duration::from_millis(50);

/// Where the sender writes its probes: the connection's packet stream
/// in production, a channel in tests.
pub trait KeepAliveSink: Send + Sync + 'static {
    fn send_keep_alive(&self, id: i64) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl KeepAliveSink for Arc<PacketStream<side::Server, state::Configuration>> {
    async fn send_keep_alive(&self, id: i64) -> anyhow::Result<()> {
        self.send_packet(configuration::Packet::KeepAlive(configuration::KeepAlive {
            id,
        }))
        .await
    }
}

/// Sends keepalive probes to the client and notifies when one is not
/// answered in time.
pub struct KeepAlive {
    pending: Arc<Mutex<HashMap<i64, Instant>>>,
    notifier: mpsc::Receiver<()>,
}

impl KeepAlive {
    /// Spawns the sender and monitor tasks. Both run until `cancel`
    /// fires.
    pub fn start<S: KeepAliveSink>(sink: S, cancel: CancellationToken) -> Self {
        Self::start_with(sink, cancel, SEND_INTERVAL, MUST_RESPOND_IN)
    }

    /// [`KeepAlive::start`] with explicit timings, for tests.
    pub fn start_with<S: KeepAliveSink>(
        sink: S,
        cancel: CancellationToken,
        send_interval: Duration,
        must_respond_in: Duration,
    ) -> Self {
        let pending = Arc::new(Mutex::new(HashMap::new()));
        let (notify_tx, notifier) = mpsc::channel(1);

        tokio::spawn(run_sender(
            sink,
            Arc::clone(&pending),
            cancel.clone(),
            send_interval,
        ));
        tokio::spawn(run_monitor(
            Arc::clone(&pending),
            notify_tx,
            cancel,
            must_respond_in,
        ));

        Self { pending, notifier }
    }

    /// Marks a keepalive id as answered. Ids that are not pending
    /// (including duplicate answers) are ignored.
    pub fn receive(&self, id: i64) {
        self.pending.lock().remove(&id);
    }

    /// Resolves when the client has failed to answer a probe in time.
    pub async fn timed_out(&mut self) {
        if self.notifier.recv().await.is_none() {
            // The monitor was cancelled; the timeout can no longer fire.
            std::future::pending::<()>().await;
        }
    }
}

async fn run_sender<S: KeepAliveSink>(
    sink: S,
    pending: Arc<Mutex<HashMap<i64, Instant>>>,
    cancel: CancellationToken,
    send_interval: Duration,
) {
    let mut ticker = time::interval(send_interval);
    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!("ending keepalive pinging");
                return;
            }
            _ = ticker.tick() => {
                let id = rand::random::<i64>();
                debug!(id, "sending keepalive");
                if let Err(e) = sink.send_keep_alive(id).await {
                    warn!("failed to write keepalive packet: {e:#}");
                }
                pending.lock().insert(id, Instant::now());
            }
        }
    }
}

async fn run_monitor(
    pending: Arc<Mutex<HashMap<i64, Instant>>>,
    notify_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
    must_respond_in: Duration,
) {
    let mut ticker = time::interval(MONITOR_INTERVAL);
    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!("ending keepalive monitoring");
                return;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let expired = pending
                    .lock()
                    .iter()
                    .find(|(_, sent)| now.duration_since(**sent) > must_respond_in)
                    .map(|(id, _)| *id);
                if let Some(id) = expired {
                    warn!(id, "client did not respond to keepalive in time");
                    let _ = notify_tx.try_send(());
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ChannelSink(mpsc::UnboundedSender<i64>);

    impl KeepAliveSink for ChannelSink {
        async fn send_keep_alive(&self, id: i64) -> anyhow::Result<()> {
            self.0.send(id)?;
            Ok(())
        }
    }

    fn sink() -> (ChannelSink, mpsc::UnboundedReceiver<i64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink(tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn answered_probe_does_not_time_out() {
        let (sink, mut rx) = sink();
        let cancel = CancellationToken::new();
        let mut keep_alive = KeepAlive::start_with(
            sink,
            cancel.clone(),
            Duration::from_secs(10),
            Duration::from_millis(200),
        );

        // The first probe goes out immediately.
        let id = rx.recv().await.unwrap();
        keep_alive.receive(id);

        let timed_out = time::timeout(Duration::from_secs(1), keep_alive.timed_out()).await;
        assert!(timed_out.is_err(), "answered probe must not time out");
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_probe_fires_timeout() {
        let (sink, mut rx) = sink();
        let cancel = CancellationToken::new();
        let mut keep_alive = KeepAlive::start_with(
            sink,
            cancel.clone(),
            Duration::from_secs(10),
            Duration::from_millis(200),
        );

        let _id = rx.recv().await.unwrap();

        time::timeout(Duration::from_secs(1), keep_alive.timed_out())
            .await
            .expect("unanswered probe must time out");
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_answers_are_ignored() {
        let (sink, mut rx) = sink();
        let cancel = CancellationToken::new();
        let mut keep_alive = KeepAlive::start_with(
            sink,
            cancel.clone(),
            Duration::from_secs(10),
            Duration::from_millis(200),
        );

        let id = rx.recv().await.unwrap();
        keep_alive.receive(id);
        keep_alive.receive(id);
        keep_alive.receive(id ^ 1); // never sent

        let timed_out = time::timeout(Duration::from_secs(1), keep_alive.timed_out()).await;
        assert!(timed_out.is_err());
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_both_tasks() {
        let (sink, mut rx) = sink();
        let cancel = CancellationToken::new();
        let mut keep_alive = KeepAlive::start_with(
            sink,
            cancel.clone(),
            Duration::from_millis(100),
            Duration::from_millis(100),
        );

        cancel.cancel();

        // The sender exits and drops its side of the channel.
        while rx.recv().await.is_some() {}

        // With the monitor gone the timeout can no longer fire.
        let timed_out = time::timeout(Duration::from_secs(1), keep_alive.timed_out()).await;
        assert!(timed_out.is_err());
    }
}
