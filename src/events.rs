//! Decoupled event bus for editor observers.
//!
//! The editor emits events via [`EventBus::emit`]; renderers subscribe via
//! [`EventBus::subscribe`]. Built on [`tokio::sync::broadcast`] so
//! multiple listeners can react independently.

use tokio::sync::broadcast;

use crate::effects::Effect;
use crate::job::JobId;

/// Events that flow out of the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The image being edited changed (`None` when it was removed).
    ResourceChanged { resource: Option<String> },
    /// A job started polling its combined locator.
    JobStarted {
        job: JobId,
        effect: Effect,
        locator: String,
    },
    /// A job's progress moved.
    Progress { job: JobId, progress: u8 },
    /// A job finished. `assumed` is set when polling ran out and the result
    /// was accepted without confirmation.
    JobCompleted {
        job: JobId,
        result: String,
        assumed: bool,
    },
    /// A job could not be started.
    JobFailed { job: JobId, message: String },
    /// An effect was switched off and the result recomputed.
    EffectRemoved { effect: Effect, locator: String },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(Event::Progress {
            job: JobId(1),
            progress: 42,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            Event::Progress {
                job: JobId(1),
                progress: 42
            }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(Event::ResourceChanged {
            resource: Some("https://cdn/a.png".to_string()),
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1, e2);
    }

    #[test]
    fn emit_without_subscribers_returns_zero() {
        let bus = EventBus::default();
        let count = bus.emit(Event::ResourceChanged { resource: None });
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for progress in [11, 13, 14] {
            bus.emit(Event::Progress {
                job: JobId(1),
                progress,
            });
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            Event::Progress {
                job: JobId(1),
                progress: 13
            }
        );
    }
}
