//! Notification dispatcher
//!
//! `dispatch` is a `try_send` into a bounded channel; a full queue drops
//! the event with a warning. One worker thread drains the queue and calls
//! every notifier in order. Dropping the dispatcher closes the queue and
//! waits for the worker to deliver what is already queued.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::Notifier;
use crate::logic::alert::AlertEvent;

pub struct NotificationDispatcher {
    sender: Option<SyncSender<AlertEvent>>,
    worker: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
    delivered: Arc<AtomicU64>,
}

impl NotificationDispatcher {
    pub fn start(notifiers: Vec<Arc<dyn Notifier>>, capacity: usize) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let delivered = Arc::new(AtomicU64::new(0));

        let worker = {
            let delivered = Arc::clone(&delivered);
            std::thread::Builder::new()
                .name("maintai-notify".to_string())
                .spawn(move || run_worker(receiver, notifiers, delivered))?
        };

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            dropped: Arc::new(AtomicU64::new(0)),
            delivered,
        })
    }

    /// Queue an event; returns false when it was dropped
    pub fn dispatch(&self, event: &AlertEvent) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Notification queue full, dropping alert {}", event.id);
                false
            }
            Err(TrySendError::Disconnected(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Notification worker gone, dropping alert {}", event.id);
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events the worker has finished handing to every notifier
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

fn run_worker(receiver: Receiver<AlertEvent>, notifiers: Vec<Arc<dyn Notifier>>, delivered: Arc<AtomicU64>) {
    log::debug!("Notification worker started with {} notifier(s)", notifiers.len());

    for event in receiver {
        for notifier in &notifiers {
            match catch_unwind(AssertUnwindSafe(|| notifier.notify(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Notifier '{}' failed for alert {}: {}", notifier.name(), event.id, e),
                Err(_) => log::error!("Notifier '{}' panicked on alert {}", notifier.name(), event.id),
            }
        }
        delivered.fetch_add(1, Ordering::Relaxed);
    }

    log::debug!("Notification worker stopped");
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Notification worker panicked");
            }
        }
    }
}
