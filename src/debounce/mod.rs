//! Quiet-period debouncing
//!
//! A [`Debouncer`] is a background task holding at most one pending item.
//! Each new item replaces the pending one and restarts the quiet-period
//! timer; when the timer runs out the latest item is forwarded on the output
//! channel. The engine runs two of these: a short one for incremental
//! analyses and a longer one for full-file analyses.

use crate::telemetry;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

enum Command<T> {
    Push(T),
    Clear,
}

/// Sending side of a debouncer.
pub struct DebounceHandle<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
}

impl<T> Clone for DebounceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> DebounceHandle<T> {
    /// Replace the pending item and restart the timer.
    ///
    /// Returns false once the debouncer has stopped.
    pub fn push(&self, item: T) -> bool {
        self.tx.send(Command::Push(item)).is_ok()
    }

    /// Drop the pending item, if any, without forwarding it.
    pub fn clear(&self) -> bool {
        self.tx.send(Command::Clear).is_ok()
    }
}

/// Single-slot debouncer task.
pub struct Debouncer<T> {
    channel: &'static str,
    quiet: Duration,
    rx: mpsc::UnboundedReceiver<Command<T>>,
    out: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer, its input handle and its output receiver.
    ///
    /// `channel` labels log lines and metrics.
    pub fn new(
        channel: &'static str,
        quiet: Duration,
    ) -> (Self, DebounceHandle<T>, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (out, out_rx) = mpsc::unbounded_channel();
        (
            Self {
                channel,
                quiet,
                rx,
                out,
            },
            DebounceHandle { tx },
            out_rx,
        )
    }

    /// Run until cancelled, the inputs close, or the output is dropped.
    ///
    /// A pending item is discarded on shutdown.
    pub fn start(mut self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let sleep = tokio::time::sleep(self.quiet);
            tokio::pin!(sleep);
            let mut pending: Option<T> = None;

            tracing::debug!(
                channel = self.channel,
                quiet_ms = self.quiet.as_millis() as u64,
                "Debouncer started"
            );

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::debug!(channel = self.channel, "Debouncer shutting down");
                        break;
                    }
                    cmd = self.rx.recv() => match cmd {
                        Some(Command::Push(item)) => {
                            if pending.replace(item).is_some() {
                                telemetry::record_coalesced(self.channel);
                                tracing::trace!(channel = self.channel, "Coalesced pending item");
                            }
                            sleep.as_mut().reset(Instant::now() + self.quiet);
                        }
                        Some(Command::Clear) => {
                            if pending.take().is_some() {
                                tracing::debug!(channel = self.channel, "Discarded pending item");
                            }
                        }
                        None => break,
                    },
                    _ = &mut sleep, if pending.is_some() => {
                        if let Some(item) = pending.take() {
                            tracing::trace!(channel = self.channel, "Quiet period elapsed");
                            if self.out.send(item).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        })
    }
}
