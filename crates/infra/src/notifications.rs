//! Outbound notifications.
//!
//! A background worker subscribes to the event bus, turns the events that
//! need a human or a supplier's attention into [`Notification`]s and hands
//! them to a [`Notifier`]. Delivery is best effort: failures are logged and
//! the worker moves on.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

use stockroom_catalog::ItemId;
use stockroom_core::{AggregateId, TenantId};
use stockroom_events::{EventBus, EventEnvelope, Subscription};

pub const PURCHASE_ORDER_SENT: &str = "purchasing.purchase_order.sent";
pub const STOCK_LOW: &str = "inventory.stock.low";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A purchase order to be delivered to its supplier.
    PurchaseOrderDispatched {
        tenant_id: TenantId,
        order_id: AggregateId,
        payload: JsonValue,
    },
    LowStock {
        tenant_id: TenantId,
        item_id: ItemId,
        sku: String,
        on_hand: i64,
        min_stock_level: i64,
    },
}

impl Notification {
    /// The notification an event calls for, if any.
    pub fn from_envelope(envelope: &EventEnvelope<JsonValue>) -> Option<Self> {
        match envelope.event_type() {
            PURCHASE_ORDER_SENT => Some(Notification::PurchaseOrderDispatched {
                tenant_id: envelope.tenant_id(),
                order_id: envelope.aggregate_id(),
                payload: envelope.payload().clone(),
            }),
            STOCK_LOW => {
                let payload: LowStockPayload =
                    serde_json::from_value(envelope.payload().clone()).ok()?;
                Some(Notification::LowStock {
                    tenant_id: envelope.tenant_id(),
                    item_id: payload.item_id,
                    sku: payload.sku,
                    on_hand: payload.on_hand,
                    min_stock_level: payload.min_stock_level,
                })
            }
            _ => None,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        match self {
            Notification::PurchaseOrderDispatched { tenant_id, .. }
            | Notification::LowStock { tenant_id, .. } => *tenant_id,
        }
    }
}

#[derive(Deserialize)]
struct LowStockPayload {
    item_id: ItemId,
    sku: String,
    on_hand: i64,
    min_stock_level: i64,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivery channel for notifications (mail, webhook, chat, ...).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification {
            Notification::PurchaseOrderDispatched {
                tenant_id, order_id, ..
            } => info!(%tenant_id, %order_id, "purchase order dispatched to supplier"),
            Notification::LowStock {
                tenant_id,
                sku,
                on_hand,
                min_stock_level,
                ..
            } => warn!(%tenant_id, sku = %sku, on_hand, min_stock_level, "stock below minimum level"),
        }
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Delivery("recorder lock poisoned".into()))?
            .push(notification.clone());
        Ok(())
    }
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Bus subscriber feeding a [`Notifier`].
#[derive(Debug)]
pub struct NotificationWorker;

impl NotificationWorker {
    /// Spawn the worker thread.
    ///
    /// - `tenant_id`: when provided, events of other tenants are ignored
    pub fn spawn<B>(
        bus: B,
        tenant_id: Option<TenantId>,
        notifier: Arc<dyn Notifier>,
    ) -> io::Result<WorkerHandle>
    where
        B: EventBus<EventEnvelope<JsonValue>>,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new()
            .name("notifications".to_string())
            .spawn(move || worker_loop(sub, shutdown_rx, tenant_id, notifier.as_ref()))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(
    sub: Subscription<EventEnvelope<JsonValue>>,
    shutdown_rx: mpsc::Receiver<()>,
    tenant_id: Option<TenantId>,
    notifier: &dyn Notifier,
) {
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                if tenant_id.is_some_and(|t| envelope.tenant_id() != t) {
                    continue;
                }
                let Some(notification) = Notification::from_envelope(&envelope) else {
                    continue;
                };
                if let Err(err) = notifier.notify(&notification) {
                    warn!(
                        event_type = envelope.event_type(),
                        error = %err,
                        "notification delivery failed"
                    );
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::time::Instant;

    use stockroom_catalog::LocationId;
    use stockroom_events::InMemoryEventBus;
    use stockroom_inventory::StockEvent;
    use stockroom_parties::PartyId;
    use stockroom_purchasing::{
        CreatePurchaseOrderRequest, PurchaseLineRequest, PurchaseOrder, PurchaseOrderEvent,
        PurchaseOrderId,
    };

    fn low_stock_envelope(tenant_id: TenantId) -> EventEnvelope<JsonValue> {
        let item_id = ItemId::generate();
        let event = StockEvent::LowStockDetected {
            tenant_id,
            item_id,
            sku: "SKU-1".into(),
            on_hand: 2,
            min_stock_level: 5,
            occurred_at: Utc::now(),
        };
        EventEnvelope::from_typed(tenant_id, item_id.aggregate_id(), "catalog.item", &event)
            .unwrap()
    }

    fn wait_for(recorder: &RecordingNotifier, count: usize) -> Vec<Notification> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let sent = recorder.sent();
            if sent.len() >= count || Instant::now() > deadline {
                return sent;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn sent_purchase_orders_become_dispatch_notifications() {
        let tenant_id = TenantId::new();
        let order = PurchaseOrder::create(
            tenant_id,
            PurchaseOrderId::generate(),
            "PO-000001".into(),
            CreatePurchaseOrderRequest {
                supplier_id: PartyId::generate(),
                location_id: LocationId::generate(),
                lines: vec![PurchaseLineRequest {
                    item_id: ItemId::generate(),
                    quantity: 3,
                    unit_cost: dec!(1.00),
                }],
                expected_date: None,
                notes: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        let envelope = EventEnvelope::from_typed(
            tenant_id,
            order.id.aggregate_id(),
            "purchasing.purchase_order",
            &PurchaseOrderEvent::sent(&order, Utc::now()),
        )
        .unwrap();

        let notification = Notification::from_envelope(&envelope).unwrap();

        assert!(matches!(
            notification,
            Notification::PurchaseOrderDispatched { order_id, .. } if order_id == order.id.aggregate_id()
        ));
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let tenant_id = TenantId::new();
        let mut envelope = low_stock_envelope(tenant_id);
        assert!(Notification::from_envelope(&envelope).is_some());

        envelope = EventEnvelope::new(
            uuid::Uuid::now_v7(),
            tenant_id,
            AggregateId::new(),
            "catalog.item",
            "catalog.item.created",
            Utc::now(),
            serde_json::json!({}),
        );
        assert!(Notification::from_envelope(&envelope).is_none());
    }

    #[test]
    fn worker_delivers_low_stock_alerts_for_its_tenant() {
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
        let recorder = Arc::new(RecordingNotifier::new());
        let tenant = TenantId::new();

        let handle =
            NotificationWorker::spawn(bus.clone(), Some(tenant), recorder.clone()).unwrap();

        bus.publish(low_stock_envelope(TenantId::new())).unwrap();
        bus.publish(low_stock_envelope(tenant)).unwrap();

        let sent = wait_for(&recorder, 1);
        handle.shutdown();

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].tenant_id(), tenant);
        assert!(matches!(&sent[0], Notification::LowStock { on_hand: 2, .. }));
    }
}
