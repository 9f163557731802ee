//! Periodic input-state broadcast.
//!
//! Once the server has accepted the session, the controller starts a
//! [`Heartbeat`]: a background task that sends the current button state as
//! a `Buttons` packet on the unreliable channel every interval. Losing or
//! reordering one is harmless, since the next carries the same state.
//!
//! Timing follows a skip policy: if the task wakes up late (a busy runtime,
//! a suspended laptop) it does not fire a burst of catch-up beats. It sends
//! once and schedules the next beat one interval from now.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use peerchat_protocol::{ClientMessage, WireMessage};
use peerchat_transport::ChannelTransport;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// Handle to a running heartbeat task.
///
/// Stop it with [`cancel`](Self::cancel). Dropping the handle aborts the
/// task as well, so a heartbeat never outlives its controller.
pub struct Heartbeat {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    beats: Arc<AtomicU64>,
}

impl Heartbeat {
    /// Spawns the heartbeat task.
    ///
    /// The first beat fires after `interval` plus a random delay in
    /// `0..jitter`. Must be called from inside a Tokio runtime.
    pub fn start<T: ChannelTransport>(
        transport: Arc<T>,
        buttons: Arc<AtomicBool>,
        interval: Duration,
        jitter: Duration,
    ) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let beats = Arc::new(AtomicU64::new(0));

        let first_delay = interval + random_jitter(jitter);
        debug!(
            interval_ms = interval.as_secs_f64() * 1000.0,
            first_ms = first_delay.as_secs_f64() * 1000.0,
            "heartbeat started"
        );

        let handle = tokio::spawn(run(
            transport,
            buttons,
            interval,
            Instant::now() + first_delay,
            stop_rx,
            Arc::clone(&beats),
        ));

        Self {
            stop,
            handle: Some(handle),
            beats,
        }
    }

    /// Number of beats sent (or attempted) so far.
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the task and waits for it to end.
    ///
    /// No beat is sent after this returns.
    pub async fn cancel(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        debug!(beats = self.beats(), "heartbeat stopped");
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn random_jitter(max: Duration) -> Duration {
    let max_us = max.as_micros() as u64;
    if max_us == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::rng().random_range(0..max_us))
}

async fn run<T: ChannelTransport>(
    transport: Arc<T>,
    buttons: Arc<AtomicBool>,
    interval: Duration,
    first: Instant,
    mut stop: watch::Receiver<bool>,
    beats: Arc<AtomicU64>,
) {
    let mut next = first;
    loop {
        tokio::select! {
            _ = time::sleep_until(next) => {}
            // Fires on stop, and on the sender being dropped.
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }

        let pressed = buttons.load(Ordering::Relaxed);
        let msg = ClientMessage::Buttons { pressed };
        let count = beats.fetch_add(1, Ordering::Relaxed) + 1;
        match transport.send(msg.channel(), &msg.encode()) {
            Ok(()) => trace!(beat = count, pressed, "heartbeat sent"),
            Err(e) => trace!(beat = count, error = %e, "heartbeat send failed"),
        }

        let now = Instant::now();
        next += interval;
        if next <= now {
            // Woke up late: skip the missed beats.
            next = now + interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerchat_transport::{memory_pair, Channel, LoopbackSignaler};

    #[tokio::test(start_paused = true)]
    async fn test_beats_at_interval() {
        let (transport, mut peer) = memory_pair(LoopbackSignaler);
        peer.establish();
        let _events = transport.connect().await.unwrap();
        let transport = Arc::new(transport);
        let buttons = Arc::new(AtomicBool::new(false));

        let hb = Heartbeat::start(
            Arc::clone(&transport),
            Arc::clone(&buttons),
            Duration::from_millis(100),
            Duration::ZERO,
        );

        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(hb.beats(), 3);

        let sent = peer.drain();
        assert_eq!(sent.len(), 3);
        assert!(sent
            .iter()
            .all(|(ch, data)| *ch == Channel::Unreliable && data == &[0x04, 0x00]));

        hb.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reflects_latest_button_state() {
        let (transport, mut peer) = memory_pair(LoopbackSignaler);
        peer.establish();
        let _events = transport.connect().await.unwrap();
        let buttons = Arc::new(AtomicBool::new(false));

        let hb = Heartbeat::start(
            Arc::new(transport),
            Arc::clone(&buttons),
            Duration::from_millis(100),
            Duration::ZERO,
        );

        time::sleep(Duration::from_millis(150)).await;
        buttons.store(true, Ordering::Relaxed);
        time::sleep(Duration::from_millis(100)).await;

        let sent: Vec<_> = peer.drain().into_iter().map(|(_, d)| d).collect();
        assert_eq!(sent, vec![vec![0x04, 0x00], vec![0x04, 0x01]]);
        hb.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_beats() {
        let (transport, mut peer) = memory_pair(LoopbackSignaler);
        peer.establish();
        let _events = transport.connect().await.unwrap();

        let hb = Heartbeat::start(
            Arc::new(transport),
            Arc::new(AtomicBool::new(false)),
            Duration::from_millis(100),
            Duration::ZERO,
        );
        time::sleep(Duration::from_millis(250)).await;
        assert!(hb.is_running());
        hb.cancel().await;

        let before = peer.drain().len();
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(before, 2);
        assert!(peer.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_delays_first_beat_only() {
        let (transport, mut peer) = memory_pair(LoopbackSignaler);
        peer.establish();
        let _events = transport.connect().await.unwrap();

        let hb = Heartbeat::start(
            Arc::new(transport),
            Arc::new(AtomicBool::new(false)),
            Duration::from_millis(100),
            Duration::from_millis(50),
        );

        // First beat lands somewhere in 100..150 ms.
        time::sleep(Duration::from_millis(99)).await;
        assert_eq!(peer.drain().len(), 0);
        time::sleep(Duration::from_millis(51)).await;
        assert_eq!(peer.drain().len(), 1);
        hb.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_stop_the_task() {
        // Unreliable channel never opens, so every send fails.
        let (transport, peer) = memory_pair(LoopbackSignaler);
        peer.open_channel(Channel::ReliableOrdered);
        let _events = transport.connect().await.unwrap();

        let hb = Heartbeat::start(
            Arc::new(transport),
            Arc::new(AtomicBool::new(true)),
            Duration::from_millis(100),
            Duration::ZERO,
        );
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(hb.beats(), 3);
        assert!(hb.is_running());
        hb.cancel().await;
    }
}
