//! Income mutation events and their in-process bus.
//!
//! Listeners are registered explicitly at startup and are invoked in
//! registration order, inline with the mutation that raised the event. A
//! failing listener is logged and skipped; it never fails the publisher.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Raised after an income entry has been written. Carries only the id;
/// listeners re-read whatever they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeEvent {
    Created { entry_id: i64 },
    Modified { entry_id: i64 },
}

impl IncomeEvent {
    pub fn entry_id(&self) -> i64 {
        match self {
            Self::Created { entry_id } | Self::Modified { entry_id } => *entry_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "INCOME_ENTRY_CREATED",
            Self::Modified { .. } => "INCOME_ENTRY_MODIFIED",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{listener} failed: {message}")]
pub struct ListenerError {
    pub listener: &'static str,
    pub message: String,
}

#[async_trait]
pub trait IncomeEventListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_income_event(
        &self,
        event: &IncomeEvent,
    ) -> Result<(), ListenerError>;
}

#[derive(Default, Clone)]
pub struct IncomeEventBus {
    listeners: Vec<Arc<dyn IncomeEventListener>>,
}

impl IncomeEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        listener: Arc<dyn IncomeEventListener>,
    ) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers `event` to every listener. Returns the number of listeners
    /// that failed.
    pub async fn publish(
        &self,
        event: IncomeEvent,
    ) -> usize {
        debug!(kind = event.kind(), entry_id = event.entry_id(), "publishing income event");

        let mut failures = 0;
        for listener in &self.listeners {
            if let Err(e) = listener.on_income_event(&event).await {
                failures += 1;
                error!(
                    listener = listener.name(),
                    entry_id = event.entry_id(),
                    error = %e,
                    "income event listener failed"
                );
            }
        }
        failures
    }
}

impl std::fmt::Debug for IncomeEventBus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("IncomeEventBus")
            .field(
                "listeners",
                &self.listeners.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<IncomeEvent>>,
    }

    #[async_trait]
    impl IncomeEventListener for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn on_income_event(
            &self,
            event: &IncomeEvent,
        ) -> Result<(), ListenerError> {
            self.seen.lock().unwrap().push(*event);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl IncomeEventListener for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn on_income_event(
            &self,
            _event: &IncomeEvent,
        ) -> Result<(), ListenerError> {
            Err(ListenerError {
                listener: "failing",
                message: "boom".to_string(),
            })
        }
    }

    #[test]
    fn entry_id_and_kind() {
        let created = IncomeEvent::Created { entry_id: 7 };
        let modified = IncomeEvent::Modified { entry_id: 8 };

        assert_eq!((created.entry_id(), created.kind()), (7, "INCOME_ENTRY_CREATED"));
        assert_eq!((modified.entry_id(), modified.kind()), (8, "INCOME_ENTRY_MODIFIED"));
    }

    #[tokio::test]
    async fn publish_reaches_every_listener_in_order() {
        let recorder = Arc::new(Recorder::default());
        let mut bus = IncomeEventBus::new();
        bus.subscribe(recorder.clone());

        bus.publish(IncomeEvent::Created { entry_id: 1 }).await;
        bus.publish(IncomeEvent::Modified { entry_id: 1 }).await;

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![
                IncomeEvent::Created { entry_id: 1 },
                IncomeEvent::Modified { entry_id: 1 }
            ]
        );
    }

    #[tokio::test]
    async fn failing_listener_does_not_stop_delivery() {
        let recorder = Arc::new(Recorder::default());
        let mut bus = IncomeEventBus::new();
        bus.subscribe(Arc::new(Failing));
        bus.subscribe(recorder.clone());

        let failures = bus.publish(IncomeEvent::Created { entry_id: 3 }).await;

        assert_eq!(failures, 1);
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn publish_without_listeners_is_a_no_op() {
        let bus = IncomeEventBus::new();

        assert_eq!(bus.publish(IncomeEvent::Created { entry_id: 1 }).await, 0);
        assert_eq!(bus.listener_count(), 0);
    }
}
