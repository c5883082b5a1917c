use haul_core::{
    ActionCode, ActorRole, LifecycleStatus, ProcessLogEntry, ProcessLogRepository, StoreResult,
    Subject, WarehouseTransaction,
};
use std::sync::Arc;

/// Append-only writer of audit entries. Entries are never updated or removed.
#[derive(Clone)]
pub struct ProcessLogRecorder {
    repo: Arc<dyn ProcessLogRepository>,
}

impl ProcessLogRecorder {
    pub fn new(repo: Arc<dyn ProcessLogRepository>) -> Self {
        Self { repo }
    }

    /// Records a standalone action outside any warehouse transaction.
    pub async fn record(
        &self,
        action: ActionCode,
        actor_role: &ActorRole,
        subject: Subject,
    ) -> StoreResult<ProcessLogEntry> {
        let entry = ProcessLogEntry::new(action, actor_role.clone(), subject);
        self.record_entry(entry).await
    }

    pub async fn record_entry(&self, entry: ProcessLogEntry) -> StoreResult<ProcessLogEntry> {
        self.repo.append(&entry).await?;
        tracing::debug!("Recorded {} on {} by {}", entry.action, entry.subject, entry.actor_role);
        Ok(entry)
    }

    /// Stages the entry on an open transaction; it lands only if the transaction commits.
    pub async fn record_in(
        &self,
        tx: &mut dyn WarehouseTransaction,
        entry: ProcessLogEntry,
    ) -> StoreResult<ProcessLogEntry> {
        tx.append_log(&entry).await?;
        Ok(entry)
    }

    pub async fn history(&self, subject: &Subject) -> StoreResult<Vec<ProcessLogEntry>> {
        self.repo.history(subject).await
    }

    /// Current status of a subject as derived from its transitions alone.
    pub async fn replay<S: LifecycleStatus>(&self, subject: &Subject) -> StoreResult<Option<S>> {
        let history = self.history(subject).await?;
        Ok(history.iter().filter_map(|e| e.target_status::<S>()).last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::{PackingStatus, StatusDomain};
    use haul_store::MemoryWarehouseStore;

    #[tokio::test]
    async fn test_record_and_history() {
        let store = MemoryWarehouseStore::new();
        let recorder = ProcessLogRecorder::new(Arc::new(store.clone()));
        let actor = ActorRole::new("warehouse_staff").unwrap();
        let subject = Subject::new(StatusDomain::Packing, "p-1");

        let entry = recorder
            .record(ActionCode::PackingCreated, &actor, subject.clone())
            .await
            .unwrap();

        let history = recorder.history(&subject).await.unwrap();
        assert_eq!(history, vec![entry]);
        assert_eq!(history[0].actor_role.as_str(), "WAREHOUSE_STAFF");

        let other = recorder
            .history(&Subject::new(StatusDomain::Packing, "p-2"))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_replay_follows_last_transition() {
        let store = MemoryWarehouseStore::new();
        let recorder = ProcessLogRecorder::new(Arc::new(store));
        let actor = ActorRole::system();
        let subject = Subject::new(StatusDomain::Packing, "p-1");

        assert_eq!(recorder.replay::<PackingStatus>(&subject).await.unwrap(), None);

        recorder
            .record(ActionCode::PackingCreated, &actor, subject.clone())
            .await
            .unwrap();
        let transition = ProcessLogEntry::new(ActionCode::PackingDispatched, actor, subject.clone())
            .with_transition(PackingStatus::Created, PackingStatus::Dispatched);
        recorder.record_entry(transition).await.unwrap();

        assert_eq!(
            recorder.replay::<PackingStatus>(&subject).await.unwrap(),
            Some(PackingStatus::Dispatched)
        );
    }
}
