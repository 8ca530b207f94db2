use crate::interface::{SnapshotPair, TriggeredEvent};
use crate::output::notify::{NotificationMessage, Notifier};
use crate::output::snapshot::SnapshotWriter;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

/// Side effects of a fired event: persist the snapshot pair, then notify.
///
/// Failures are logged and counted here and never reach the frame loop.
pub struct EventHandler {
    writer: Box<dyn SnapshotWriter + Send>,
    notifier: Option<Box<dyn Notifier + Send>>,
    message: NotificationMessage,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl EventHandler {
    pub fn new(
        writer: Box<dyn SnapshotWriter + Send>,
        notifier: Option<Box<dyn Notifier + Send>>,
        message: NotificationMessage,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            writer,
            notifier,
            message,
            metrics,
            logger: LogManager::new("events"),
        }
    }

    /// Returns the written pair, or `None` when the snapshot could not be saved.
    pub fn handle(&mut self, event: &TriggeredEvent) -> Option<SnapshotPair> {
        let pair = match self.writer.write(event) {
            Ok(pair) => pair,
            Err(err) => {
                self.metrics.record_snapshot(false);
                self.logger
                    .warn(&format!("snapshot skipped, event not delivered: {}", err));
                return None;
            }
        };
        self.metrics.record_snapshot(true);
        self.logger.record(&format!(
            "saved {} (raw copy {})",
            pair.annotated_path.display(),
            pair.raw_path.display()
        ));

        if let Some(notifier) = self.notifier.as_mut() {
            self.logger.record("sending notification...");
            let attachments = [pair.annotated_path.clone()];
            match notifier.notify(&self.message.subject, &self.message.body, &attachments) {
                Ok(()) => {
                    self.metrics.record_notification(true);
                    self.logger.record("notification sent");
                }
                Err(err) => {
                    self.metrics.record_notification(false);
                    self.logger.warn(&format!("error sending notification: {}", err));
                }
            }
        }

        Some(pair)
    }
}

/// Where fired events go: handled on the loop thread, or handed to a worker.
pub enum EventSink {
    Inline(EventHandler),
    Worker(EventWorker),
}

impl EventSink {
    pub fn inline(handler: EventHandler) -> Self {
        EventSink::Inline(handler)
    }

    pub fn worker(handler: EventHandler, capacity: usize) -> Self {
        EventSink::Worker(EventWorker::spawn(handler, capacity))
    }

    /// Handles or queues the event. Inline handling returns the written pair.
    pub fn submit(&mut self, event: TriggeredEvent) -> Option<SnapshotPair> {
        match self {
            EventSink::Inline(handler) => handler.handle(&event),
            EventSink::Worker(worker) => {
                worker.submit(event);
                None
            }
        }
    }

    /// Drains queued events (worker mode) and releases the handler.
    pub fn shutdown(self) {
        if let EventSink::Worker(worker) = self {
            worker.shutdown();
        }
    }
}

/// Background thread that owns the [`EventHandler`] and consumes a bounded queue.
pub struct EventWorker {
    sender: mpsc::Sender<TriggeredEvent>,
    handle: JoinHandle<()>,
    logger: LogManager,
}

impl EventWorker {
    pub fn spawn(mut handler: EventHandler, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<TriggeredEvent>(capacity.max(1));
        let handle = thread::spawn(move || {
            while let Some(event) = receiver.blocking_recv() {
                handler.handle(&event);
            }
        });

        Self {
            sender,
            handle,
            logger: LogManager::new("events"),
        }
    }

    /// Blocks while the queue is full.
    pub fn submit(&self, event: TriggeredEvent) {
        if self.sender.blocking_send(event).is_err() {
            self.logger.warn("event worker stopped; event dropped");
        }
    }

    pub fn shutdown(self) {
        drop(self.sender);
        if self.handle.join().is_err() {
            self.logger.warn("event worker panicked");
        }
    }
}
