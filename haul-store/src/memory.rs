//! In-memory backend.
//!
//! Used by tests and the `memory` storage mode. A transaction owns the single
//! state lock from `begin` until commit or drop, so units of work are fully
//! serialized. Writes are staged and applied at commit, which cannot fail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use haul_core::{
    CodeSnapshot, CodeState, Packing, PackingStatus, ProcessLogEntry, ProcessLogRepository,
    StoreError, StoreResult, Subject, TrackingCode, WarehouseItem, WarehouseItemStatus,
    WarehouseStore, WarehouseTransaction,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct WarehouseState {
    items: HashMap<TrackingCode, WarehouseItem>,
    packings: HashMap<Uuid, Packing>,
    active_by_code: HashMap<TrackingCode, Uuid>,
    log: Vec<ProcessLogEntry>,
}

impl WarehouseState {
    fn snapshot(&self, codes: &[TrackingCode]) -> CodeSnapshot {
        codes
            .iter()
            .filter_map(|code| {
                self.items.get(code).map(|item| {
                    let state = CodeState {
                        item: item.clone(),
                        active_packing: self.active_by_code.get(code).copied(),
                    };
                    (code.clone(), state)
                })
            })
            .collect()
    }

    fn apply(&mut self, write: StagedWrite) {
        match write {
            StagedWrite::InsertPacking(packing) => {
                if packing.is_active() {
                    for code in &packing.tracking_codes {
                        self.active_by_code.insert(code.clone(), packing.id);
                    }
                }
                self.packings.insert(packing.id, packing);
            }
            StagedWrite::PackingStatus { id, status, at } => {
                if let Some(packing) = self.packings.get_mut(&id) {
                    packing.status = status;
                    if status == PackingStatus::Dispatched {
                        packing.dispatched_at = Some(at);
                    }
                    if !packing.is_active() {
                        for code in &packing.tracking_codes {
                            if self.active_by_code.get(code) == Some(&id) {
                                self.active_by_code.remove(code);
                            }
                        }
                    }
                }
            }
            StagedWrite::ItemStatus { code, status } => {
                if let Some(item) = self.items.get_mut(&code) {
                    item.status = status;
                    item.updated_at = Utc::now();
                }
            }
            StagedWrite::Log(entry) => self.log.push(entry),
        }
    }
}

#[derive(Debug)]
enum StagedWrite {
    InsertPacking(Packing),
    PackingStatus {
        id: Uuid,
        status: PackingStatus,
        at: DateTime<Utc>,
    },
    ItemStatus {
        code: TrackingCode,
        status: WarehouseItemStatus,
    },
    Log(ProcessLogEntry),
}

/// Warehouse, packing and process-log state behind one lock.
#[derive(Clone, Default)]
pub struct MemoryWarehouseStore {
    state: Arc<Mutex<WarehouseState>>,
}

impl MemoryWarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stand-in for warehouse intake: registers or replaces an item.
    pub async fn insert_item(&self, item: WarehouseItem) {
        let mut state = self.state.lock().await;
        state.items.insert(item.tracking_code.clone(), item);
    }

    /// Direct status write, as done by intake or delivery updates outside this core.
    pub async fn set_item_status(
        &self,
        code: &TrackingCode,
        status: WarehouseItemStatus,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        item.status = status;
        item.updated_at = Utc::now();
        Ok(())
    }

    pub async fn packings(&self) -> Vec<Packing> {
        let state = self.state.lock().await;
        let mut packings: Vec<Packing> = state.packings.values().cloned().collect();
        packings.sort_by_key(|p| p.created_at);
        packings
    }

    /// Every log entry across all subjects, in append order.
    pub async fn log_entries(&self) -> Vec<ProcessLogEntry> {
        self.state.lock().await.log.clone()
    }
}

#[async_trait]
impl WarehouseStore for MemoryWarehouseStore {
    async fn snapshot(&self, codes: &[TrackingCode]) -> StoreResult<CodeSnapshot> {
        let state = self.state.lock().await;
        Ok(state.snapshot(codes))
    }

    async fn get_item(&self, code: &TrackingCode) -> StoreResult<Option<WarehouseItem>> {
        let state = self.state.lock().await;
        Ok(state.items.get(code).cloned())
    }

    async fn get_packing(&self, id: Uuid) -> StoreResult<Option<Packing>> {
        let state = self.state.lock().await;
        Ok(state.packings.get(&id).cloned())
    }

    async fn begin(&self) -> StoreResult<Box<dyn WarehouseTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            staged: Vec::new(),
        }))
    }
}

#[async_trait]
impl ProcessLogRepository for MemoryWarehouseStore {
    async fn append(&self, entry: &ProcessLogEntry) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.log.push(entry.clone());
        Ok(())
    }

    async fn history(&self, subject: &Subject) -> StoreResult<Vec<ProcessLogEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .log
            .iter()
            .filter(|e| &e.subject == subject)
            .cloned()
            .collect())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<WarehouseState>,
    staged: Vec<StagedWrite>,
}

impl MemoryTransaction {
    fn staged_packing(&self, id: Uuid) -> Option<&Packing> {
        self.staged.iter().find_map(|w| match w {
            StagedWrite::InsertPacking(p) if p.id == id => Some(p),
            _ => None,
        })
    }
}

#[async_trait]
impl WarehouseTransaction for MemoryTransaction {
    async fn lock_codes(&mut self, codes: &[TrackingCode]) -> StoreResult<CodeSnapshot> {
        Ok(self.guard.snapshot(codes))
    }

    async fn lock_packing(&mut self, id: Uuid) -> StoreResult<Option<Packing>> {
        Ok(self.guard.packings.get(&id).cloned())
    }

    async fn insert_packing(&mut self, packing: &Packing) -> StoreResult<()> {
        if self.guard.packings.contains_key(&packing.id) || self.staged_packing(packing.id).is_some() {
            return Err(StoreError::Conflict(format!("Packing {} already exists", packing.id)));
        }
        if packing.is_active() {
            if let Some(code) = packing
                .tracking_codes
                .iter()
                .find(|c| self.guard.active_by_code.contains_key(*c))
            {
                return Err(StoreError::Conflict(format!("{} is held by an active packing", code)));
            }
        }
        self.staged.push(StagedWrite::InsertPacking(packing.clone()));
        Ok(())
    }

    async fn update_packing_status(
        &mut self,
        id: Uuid,
        status: PackingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if !self.guard.packings.contains_key(&id) && self.staged_packing(id).is_none() {
            return Err(StoreError::NotFound(format!("packing {}", id)));
        }
        self.staged.push(StagedWrite::PackingStatus { id, status, at });
        Ok(())
    }

    async fn update_item_status(
        &mut self,
        code: &TrackingCode,
        status: WarehouseItemStatus,
    ) -> StoreResult<()> {
        if !self.guard.items.contains_key(code) {
            return Err(StoreError::NotFound(code.to_string()));
        }
        self.staged.push(StagedWrite::ItemStatus {
            code: code.clone(),
            status,
        });
        Ok(())
    }

    async fn append_log(&mut self, entry: &ProcessLogEntry) -> StoreResult<()> {
        self.staged.push(StagedWrite::Log(entry.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        debug!("Committing {} staged writes", staged.len());
        for write in staged {
            guard.apply(write);
        }
        Ok(())
    }
}
