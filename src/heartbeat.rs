//! Periodic keep-alive task.
//!
//! Once the server accepts authentication the client must send a heartbeat
//! frame every 30 seconds or the server drops the connection. The timer only
//! ever sends; the server's reply is handled by the read loop.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::protocol::Frame;
use crate::writer::WriterHandle;

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Heartbeat timer bound to one connection.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Create a stopped timer.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Heartbeat period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the timer was started and not stopped since.
    ///
    /// Stays `true` after the task gave up on a closed writer.
    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    /// Check if the timer task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the timer unless it was already started.
    ///
    /// The first heartbeat goes out one period after the start. Returns
    /// `true` if this call started it.
    pub fn start(&mut self, writer: WriterHandle) -> bool {
        if self.is_started() {
            return false;
        }
        self.task = Some(tokio::spawn(heartbeat_loop(writer, self.interval)));
        true
    }

    /// Stop the timer and wait until its task (and its writer handle) is gone.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL)
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn heartbeat_loop(writer: WriterHandle, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        tracing::debug!("send heartbeat");
        if writer.send(Frame::heartbeat()).await.is_err() {
            tracing::debug!("writer closed, heartbeat stopped");
            return;
        }
    }
}
