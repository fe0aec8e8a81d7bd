//! Fan-out of fired alerts to in-process subscribers.
//!
//! Delivery is fire-and-forget: a failing subscriber is logged and the next
//! one still runs.

use std::sync::{Arc, Mutex};

use tracing::error;

use crate::events::ListenerError;
use crate::models::ThresholdAlert;

pub trait AlertSubscriber: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_alert(
        &self,
        alert: &ThresholdAlert,
    ) -> Result<(), ListenerError>;
}

#[derive(Default, Clone)]
pub struct AlertDispatcher {
    subscribers: Vec<Arc<dyn AlertSubscriber>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        subscriber: Arc<dyn AlertSubscriber>,
    ) {
        self.subscribers.push(subscriber);
    }

    pub fn dispatch(
        &self,
        alert: &ThresholdAlert,
    ) {
        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.on_alert(alert) {
                error!(
                    subscriber = subscriber.name(),
                    kind = %alert.kind,
                    user_id = alert.user_id,
                    error = %e,
                    "alert subscriber failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field(
                "subscribers",
                &self.subscribers.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Keeps every alert it receives until [`AlertCollector::drain`] is called.
#[derive(Debug, Default)]
pub struct AlertCollector {
    alerts: Mutex<Vec<ThresholdAlert>>,
}

impl AlertCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the collected alerts, oldest first.
    pub fn drain(&self) -> Vec<ThresholdAlert> {
        match self.alerts.lock() {
            Ok(mut alerts) => std::mem::take(&mut *alerts),
            Err(_) => Vec::new(),
        }
    }
}

impl AlertSubscriber for AlertCollector {
    fn name(&self) -> &'static str {
        "alert-collector"
    }

    fn on_alert(
        &self,
        alert: &ThresholdAlert,
    ) -> Result<(), ListenerError> {
        self.alerts
            .lock()
            .map_err(|_| ListenerError {
                listener: "alert-collector",
                message: "collector lock poisoned".to_string(),
            })?
            .push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::ThresholdKind;

    struct Refusing;

    impl AlertSubscriber for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn on_alert(
            &self,
            _alert: &ThresholdAlert,
        ) -> Result<(), ListenerError> {
            Err(ListenerError {
                listener: "refusing",
                message: "offline".to_string(),
            })
        }
    }

    fn alert(kind: ThresholdKind) -> ThresholdAlert {
        ThresholdAlert {
            kind,
            ratio: dec!(1.0204),
            reference_amount: dec!(25000.00),
            user_id: 1,
            year: 2025,
            occurred_at: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn collector_receives_alerts_in_order() {
        let collector = Arc::new(AlertCollector::new());
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.subscribe(collector.clone());

        dispatcher.dispatch(&alert(ThresholdKind::Abfaerbung));
        dispatcher.dispatch(&alert(ThresholdKind::MandatoryFiling));

        let kinds: Vec<_> = collector.drain().into_iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ThresholdKind::Abfaerbung, ThresholdKind::MandatoryFiling]);
        assert!(collector.drain().is_empty());
    }

    #[test]
    fn failing_subscriber_does_not_block_the_next() {
        let collector = Arc::new(AlertCollector::new());
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.subscribe(Arc::new(Refusing));
        dispatcher.subscribe(collector.clone());

        dispatcher.dispatch(&alert(ThresholdKind::Bilanzierungspflicht));

        assert_eq!(collector.drain().len(), 1);
    }
}
