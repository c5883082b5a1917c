use chrono::Utc;
use haul_core::{
    ActionCode, ActorRole, Destination, Packing, PackingStatus, ProcessLogEntry, StoreError,
    WarehouseItemStatus, WarehouseStore,
};
use haul_shared::{PackingCreatedEvent, PackingDispatchedEvent, PackingEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::classifier::CodeBatch;
use crate::lifecycle::{LifecycleError, OrderLifecycleEngine};
use crate::validation::{RejectionReason, ValidationResult};

#[derive(Debug, thiserror::Error)]
pub enum PackingError {
    /// Business-rule failure; carries the same detail `check` would have shown.
    #[error("Packing rejected: {}", .0.message)]
    Rejected(Box<ValidationResult>),

    #[error("Packing not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PackingError {
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            PackingError::Rejected(result) => Some(result),
            _ => None,
        }
    }

    pub fn reasons(&self) -> Vec<RejectionReason> {
        self.validation().map(|r| r.reasons()).unwrap_or_default()
    }
}

/// Turns a validated batch into a packing, all-or-nothing.
#[derive(Clone)]
pub struct PackingConsolidator {
    store: Arc<dyn WarehouseStore>,
    engine: OrderLifecycleEngine,
    events: Option<broadcast::Sender<PackingEvent>>,
}

impl PackingConsolidator {
    pub fn new(store: Arc<dyn WarehouseStore>, engine: OrderLifecycleEngine) -> Self {
        Self {
            store,
            engine,
            events: None,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<PackingEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Re-validates under row locks, then writes the packing, the item status
    /// flips and their log entries in one transaction.
    pub async fn create<S: AsRef<str>>(
        &self,
        destination: &Destination,
        codes: &[S],
        actor_role: &ActorRole,
    ) -> Result<Packing, PackingError> {
        let batch = CodeBatch::from_raw(codes);
        if batch.is_empty() {
            return Err(PackingError::Rejected(Box::new(ValidationResult::empty(destination))));
        }

        // 1. Lock and re-classify; whatever `check` saw earlier may be stale
        let mut tx = self.store.begin().await?;
        let snapshot = tx.lock_codes(&batch.distinct).await?;
        let result = ValidationResult::evaluate(destination, &batch, &snapshot);

        if !result.can_create {
            tracing::warn!("Packing for {} rejected: {}", destination, result.message);
            // Dropping `tx` releases the locks without writing anything
            return Err(PackingError::Rejected(Box::new(result)));
        }

        // 2. Stage the packing and its audit entry
        let packing = Packing::new(destination.clone(), result.valid_codes, actor_role.clone());
        tx.insert_packing(&packing).await?;
        let created = ProcessLogEntry::new(ActionCode::PackingCreated, actor_role.clone(), packing.subject())
            .with_initial_status(packing.status);
        self.engine.recorder().record_in(tx.as_mut(), created).await?;

        // 3. Flip every item to PACKED
        for code in &packing.tracking_codes {
            let state = snapshot
                .get(code)
                .ok_or_else(|| StoreError::Corrupt(format!("{} vanished under lock", code)))?;

            self.engine
                .stage_transition(
                    tx.as_mut(),
                    ActionCode::WarehouseItemPacked,
                    state.item.subject(),
                    state.item.status,
                    WarehouseItemStatus::Packed,
                    actor_role,
                )
                .await?;
            tx.update_item_status(code, WarehouseItemStatus::Packed).await?;
        }

        // 4. Commit
        tx.commit().await?;

        tracing::info!(
            "Created packing {} for {} with {} item(s) by {}",
            packing.id,
            packing.destination,
            packing.tracking_codes.len(),
            actor_role
        );

        self.publish(PackingEvent::Created(PackingCreatedEvent {
            packing_id: packing.id,
            destination: packing.destination.to_string(),
            tracking_codes: packing.tracking_codes.iter().map(|c| c.to_string()).collect(),
            actor_role: actor_role.to_string(),
            timestamp: packing.created_at.timestamp(),
        }));

        Ok(packing)
    }

    /// Hands a packing to the carrier. Its codes stop being held and every
    /// item moves to DISPATCHED.
    pub async fn dispatch(&self, packing_id: Uuid, actor_role: &ActorRole) -> Result<Packing, PackingError> {
        let mut tx = self.store.begin().await?;
        let mut packing = tx
            .lock_packing(packing_id)
            .await?
            .ok_or(PackingError::NotFound(packing_id))?;

        let snapshot = tx.lock_codes(&packing.tracking_codes).await?;
        let now = Utc::now();

        self.engine
            .stage_transition(
                tx.as_mut(),
                ActionCode::PackingDispatched,
                packing.subject(),
                packing.status,
                PackingStatus::Dispatched,
                actor_role,
            )
            .await?;
        tx.update_packing_status(packing_id, PackingStatus::Dispatched, now).await?;

        for code in &packing.tracking_codes {
            let state = snapshot
                .get(code)
                .ok_or_else(|| StoreError::Corrupt(format!("packing {} references unknown code {}", packing_id, code)))?;

            self.engine
                .stage_transition(
                    tx.as_mut(),
                    ActionCode::WarehouseItemDispatched,
                    state.item.subject(),
                    state.item.status,
                    WarehouseItemStatus::Dispatched,
                    actor_role,
                )
                .await?;
            tx.update_item_status(code, WarehouseItemStatus::Dispatched).await?;
        }

        tx.commit().await?;

        packing.status = PackingStatus::Dispatched;
        packing.dispatched_at = Some(now);
        tracing::info!("Dispatched packing {} to {}", packing.id, packing.destination);

        self.publish(PackingEvent::Dispatched(PackingDispatchedEvent {
            packing_id: packing.id,
            destination: packing.destination.to_string(),
            actor_role: actor_role.to_string(),
            timestamp: now.timestamp(),
        }));

        Ok(packing)
    }

    fn publish(&self, event: PackingEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ProcessLogRecorder;
    use haul_core::{TrackingCode, WarehouseItem};
    use haul_store::MemoryWarehouseStore;

    fn code(raw: &str) -> TrackingCode {
        TrackingCode::parse(raw).unwrap()
    }

    async fn setup(codes: &[&str]) -> (PackingConsolidator, MemoryWarehouseStore) {
        let store = MemoryWarehouseStore::new();
        for raw in codes {
            store
                .insert_item(WarehouseItem::new(code(raw), WarehouseItemStatus::InWarehouse))
                .await;
        }
        let engine = OrderLifecycleEngine::new(ProcessLogRecorder::new(Arc::new(store.clone())));
        (PackingConsolidator::new(Arc::new(store.clone()), engine), store)
    }

    fn staff() -> ActorRole {
        ActorRole::new("WAREHOUSE").unwrap()
    }

    #[tokio::test]
    async fn test_create_packs_items() {
        let (consolidator, store) = setup(&["TXM001", "TXM002"]).await;
        let destination = Destination::parse("HN-01").unwrap();

        let packing = consolidator
            .create(&destination, &["TXM001", "TXM002", "TXM001"], &staff())
            .await
            .unwrap();

        assert_eq!(packing.tracking_codes, vec![code("TXM001"), code("TXM002")]);
        assert_eq!(packing.status, PackingStatus::Created);
        for raw in ["TXM001", "TXM002"] {
            let item = store.get_item(&code(raw)).await.unwrap().unwrap();
            assert_eq!(item.status, WarehouseItemStatus::Packed);
        }
        // One per item plus one for the packing
        assert_eq!(store.log_entries().await.len(), 3);
    }

    #[tokio::test]
    async fn test_replay_tracks_packing_from_creation() {
        let (consolidator, store) = setup(&["TXM001"]).await;
        let recorder = ProcessLogRecorder::new(Arc::new(store.clone()));
        let destination = Destination::parse("HN-01").unwrap();

        let packing = consolidator.create(&destination, &["TXM001"], &staff()).await.unwrap();
        assert_eq!(
            recorder.replay::<PackingStatus>(&packing.subject()).await.unwrap(),
            Some(PackingStatus::Created)
        );

        consolidator.dispatch(packing.id, &staff()).await.unwrap();
        assert_eq!(
            recorder.replay::<PackingStatus>(&packing.subject()).await.unwrap(),
            Some(PackingStatus::Dispatched)
        );
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let (consolidator, store) = setup(&[]).await;
        let destination = Destination::parse("HN-01").unwrap();
        let codes: Vec<String> = vec!["  ".to_string()];

        let err = consolidator.create(&destination, &codes, &staff()).await.unwrap_err();

        assert_eq!(err.reasons(), vec![RejectionReason::EmptyBatch]);
        assert!(store.packings().await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_releases_codes() {
        let (consolidator, store) = setup(&["TXM001"]).await;
        let destination = Destination::parse("HN-01").unwrap();
        let packing = consolidator.create(&destination, &["TXM001"], &staff()).await.unwrap();

        let dispatched = consolidator.dispatch(packing.id, &staff()).await.unwrap();

        assert_eq!(dispatched.status, PackingStatus::Dispatched);
        assert!(dispatched.dispatched_at.is_some());
        let item = store.get_item(&code("TXM001")).await.unwrap().unwrap();
        assert_eq!(item.status, WarehouseItemStatus::Dispatched);

        let again = consolidator.dispatch(packing.id, &staff()).await;
        assert!(matches!(again, Err(PackingError::Lifecycle(LifecycleError::InvalidTransition { .. }))));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_packing() {
        let (consolidator, _) = setup(&[]).await;
        let id = Uuid::new_v4();

        let err = consolidator.dispatch(id, &staff()).await.unwrap_err();
        assert!(matches!(err, PackingError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_events_published_after_commit() {
        let (consolidator, _) = setup(&["TXM001"]).await;
        let (tx, mut rx) = broadcast::channel(8);
        let consolidator = consolidator.with_events(tx);
        let destination = Destination::parse("HN-01").unwrap();

        let packing = consolidator.create(&destination, &["TXM001"], &staff()).await.unwrap();

        match rx.recv().await.unwrap() {
            PackingEvent::Created(event) => {
                assert_eq!(event.packing_id, packing.id);
                assert_eq!(event.tracking_codes, vec!["TXM001".to_string()]);
                assert_eq!(event.actor_role, "WAREHOUSE");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
