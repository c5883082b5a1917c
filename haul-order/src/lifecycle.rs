use chrono::Utc;
use haul_core::{
    ActionCode, ActorRole, LifecycleStatus, OrderLinkStatus, OrderStatus, Packing, PackingStatus,
    PaymentStatus, ProcessLogEntry, PurchaseStatus, StatusDomain, StatusRegistry, StoreError,
    Subject, TransitionDetail, UnknownStatus, WarehouseItem, WarehouseItemStatus,
    WarehouseTransaction,
};

use crate::audit::ProcessLogRecorder;
use crate::models::{Order, OrderLink, Payment, Purchase};

/// A record whose status follows one of the closed vocabularies.
pub trait Lifecycle {
    type Status: LifecycleStatus;

    fn subject(&self) -> Subject;
    fn status(&self) -> Self::Status;
    fn set_status(&mut self, status: Self::Status);
}

macro_rules! lifecycle_record {
    ($record:ty, $status:ty, $domain:ident, |$r:ident| $id:expr) => {
        impl Lifecycle for $record {
            type Status = $status;

            fn subject(&self) -> Subject {
                let $r = self;
                Subject::new(StatusDomain::$domain, $id)
            }

            fn status(&self) -> Self::Status {
                self.status
            }

            fn set_status(&mut self, status: Self::Status) {
                self.status = status;
                self.updated_at = Utc::now();
            }
        }
    };
}

lifecycle_record!(Order, OrderStatus, Order, |r| r.id.to_string());
lifecycle_record!(OrderLink, OrderLinkStatus, OrderLink, |r| r.id.to_string());
lifecycle_record!(Purchase, PurchaseStatus, Purchase, |r| r.id.to_string());
lifecycle_record!(Payment, PaymentStatus, Payment, |r| r.id.to_string());
lifecycle_record!(WarehouseItem, WarehouseItemStatus, WarehouseItem, |r| r.tracking_code.as_str());

impl Lifecycle for Packing {
    type Status = PackingStatus;

    fn subject(&self) -> Subject {
        Packing::subject(self)
    }

    fn status(&self) -> Self::Status {
        self.status
    }

    fn set_status(&mut self, status: Self::Status) {
        if status == PackingStatus::Dispatched && self.dispatched_at.is_none() {
            self.dispatched_at = Some(Utc::now());
        }
        self.status = status;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid {domain} transition from {from} to {to}")]
    InvalidTransition {
        domain: StatusDomain,
        from: String,
        to: String,
    },

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Gatekeeper for every status change. Each accepted transition leaves one
/// `STATUS_TRANSITION` (or caller-chosen) audit entry.
#[derive(Clone)]
pub struct OrderLifecycleEngine {
    recorder: ProcessLogRecorder,
}

impl OrderLifecycleEngine {
    pub fn new(recorder: ProcessLogRecorder) -> Self {
        Self { recorder }
    }

    pub fn recorder(&self) -> &ProcessLogRecorder {
        &self.recorder
    }

    /// Pure check against the transition table. Self-transitions are rejected.
    pub fn ensure<S: LifecycleStatus>(from: S, to: S) -> Result<(), LifecycleError> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                domain: S::DOMAIN,
                from: from.code().to_string(),
                to: to.code().to_string(),
            })
        }
    }

    /// Moves `record` to `to` and logs it. The record is left untouched if
    /// the edge is not allowed or the log write fails.
    pub async fn transition<R: Lifecycle>(
        &self,
        record: &mut R,
        to: R::Status,
        actor_role: &ActorRole,
    ) -> Result<ProcessLogEntry, LifecycleError> {
        let from = record.status();
        Self::ensure(from, to)?;

        let entry = ProcessLogEntry::new(ActionCode::StatusTransition, actor_role.clone(), record.subject())
            .with_transition(from, to);
        let entry = self.recorder.record_entry(entry).await?;

        record.set_status(to);
        tracing::info!("{} moved {} -> {}", record.subject(), from, to);
        Ok(entry)
    }

    /// Checks and logs a transition inside an open warehouse transaction.
    /// The caller writes the new status through the same transaction.
    pub async fn stage_transition<S: LifecycleStatus>(
        &self,
        tx: &mut dyn WarehouseTransaction,
        action: ActionCode,
        subject: Subject,
        from: S,
        to: S,
        actor_role: &ActorRole,
    ) -> Result<ProcessLogEntry, LifecycleError> {
        Self::ensure(from, to)?;
        let entry = ProcessLogEntry::new(action, actor_role.clone(), subject).with_transition(from, to);
        Ok(self.recorder.record_in(tx, entry).await?)
    }

    /// Same as `transition` for callers holding raw status codes, e.g. from a form.
    pub async fn apply_codes(
        &self,
        domain: StatusDomain,
        subject_id: &str,
        from: &str,
        to: &str,
        actor_role: &ActorRole,
    ) -> Result<ProcessLogEntry, LifecycleError> {
        if !StatusRegistry::is_valid_transition(domain, from, to)? {
            return Err(LifecycleError::InvalidTransition {
                domain,
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut entry = ProcessLogEntry::new(
            ActionCode::StatusTransition,
            actor_role.clone(),
            Subject::new(domain, subject_id),
        );
        entry.transition = Some(TransitionDetail {
            from: Some(from.to_string()),
            to: to.to_string(),
        });
        Ok(self.recorder.record_entry(entry).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::TrackingCode;
    use haul_store::MemoryWarehouseStore;
    use std::sync::Arc;

    fn engine() -> (OrderLifecycleEngine, MemoryWarehouseStore) {
        let store = MemoryWarehouseStore::new();
        let recorder = ProcessLogRecorder::new(Arc::new(store.clone()));
        (OrderLifecycleEngine::new(recorder), store)
    }

    fn staff() -> ActorRole {
        ActorRole::new("SALES").unwrap()
    }

    #[tokio::test]
    async fn test_order_lifecycle() {
        let (engine, store) = engine();
        let mut order = Order::new("customer@example.com".to_string(), "VND".to_string());

        // Pending → Confirmed → Purchasing → InTransit → Delivered → Completed
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Purchasing,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
            OrderStatus::Completed,
        ] {
            engine.transition(&mut order, next, &staff()).await.unwrap();
        }

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(store.log_entries().await.len(), 5);
        assert_eq!(
            engine.recorder().replay::<OrderStatus>(&Lifecycle::subject(&order)).await.unwrap(),
            Some(OrderStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_invalid_transition_leaves_record_untouched() {
        let (engine, store) = engine();
        let mut order = Order::new("customer@example.com".to_string(), "VND".to_string());

        let result = engine.transition(&mut order, OrderStatus::Delivered, &staff()).await;

        assert!(matches!(result, Err(LifecycleError::InvalidTransition { .. })));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(store.log_entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_states_reject_everything() {
        let (engine, _) = engine();
        let mut payment = Payment::new(uuid::Uuid::new_v4(), 500_000, "VND".to_string());

        engine.transition(&mut payment, PaymentStatus::Cancelled, &staff()).await.unwrap();

        for next in PaymentStatus::ALL {
            let result = engine.transition(&mut payment, *next, &staff()).await;
            assert!(result.is_err(), "cancelled payment accepted {}", next);
        }
    }

    #[tokio::test]
    async fn test_failed_payment_can_be_retried() {
        let (engine, _) = engine();
        let mut payment = Payment::new(uuid::Uuid::new_v4(), 500_000, "VND".to_string());

        engine.transition(&mut payment, PaymentStatus::Failed, &staff()).await.unwrap();
        engine.transition(&mut payment, PaymentStatus::Pending, &staff()).await.unwrap();
        engine.transition(&mut payment, PaymentStatus::Paid, &staff()).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_order_link_cancel_window() {
        let (engine, _) = engine();
        let mut link = OrderLink::new(
            uuid::Uuid::new_v4(),
            "https://shop.example/item".into(),
            "Item".into(),
            1,
            100_000,
        );

        engine.transition(&mut link, OrderLinkStatus::AuctionWon, &staff()).await.unwrap();
        engine.transition(&mut link, OrderLinkStatus::AwaitingPayment, &staff()).await.unwrap();
        engine.transition(&mut link, OrderLinkStatus::FullyStocked, &staff()).await.unwrap();
        engine.transition(&mut link, OrderLinkStatus::ImportedForeign, &staff()).await.unwrap();

        let cancel = engine.transition(&mut link, OrderLinkStatus::Cancelled, &staff()).await;
        assert!(cancel.is_err());
        assert_eq!(link.status, OrderLinkStatus::ImportedForeign);
    }

    #[tokio::test]
    async fn test_apply_codes_distinguishes_unknown_from_disallowed() {
        let (engine, store) = engine();

        let unknown = engine
            .apply_codes(StatusDomain::Purchase, "pur-1", "PENDING", "TELEPORTED", &staff())
            .await;
        assert!(matches!(unknown, Err(LifecycleError::UnknownStatus(_))));

        let disallowed = engine
            .apply_codes(StatusDomain::Purchase, "pur-1", "PENDING", "RECEIVED", &staff())
            .await;
        assert!(matches!(disallowed, Err(LifecycleError::InvalidTransition { .. })));

        let entry = engine
            .apply_codes(StatusDomain::Purchase, "pur-1", "PENDING", "ORDERED", &staff())
            .await
            .unwrap();
        assert_eq!(entry.target_status::<PurchaseStatus>(), Some(PurchaseStatus::Ordered));
        assert_eq!(store.log_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_warehouse_item_cannot_skip_packing() {
        let (engine, _) = engine();
        let code = TrackingCode::parse("TXM001").unwrap();
        let mut item = WarehouseItem::new(code, WarehouseItemStatus::InWarehouse);

        let result = engine
            .transition(&mut item, WarehouseItemStatus::Dispatched, &ActorRole::system())
            .await;

        assert!(result.is_err());
        assert_eq!(item.status, WarehouseItemStatus::InWarehouse);
    }
}
