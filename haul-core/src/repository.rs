use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::process_log::{ProcessLogEntry, Subject};
use crate::status::{PackingStatus, WarehouseItemStatus};
use crate::warehouse::{CodeSnapshot, Packing, TrackingCode, WarehouseItem};

/// Infrastructure failures. Kept apart from business-rule outcomes, which are data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Write conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to warehouse and packing state plus the entry point for writes.
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    /// Plain read of the given codes. No locks are held afterwards.
    async fn snapshot(&self, codes: &[TrackingCode]) -> StoreResult<CodeSnapshot>;

    async fn get_item(&self, code: &TrackingCode) -> StoreResult<Option<WarehouseItem>>;

    async fn get_packing(&self, id: Uuid) -> StoreResult<Option<Packing>>;

    /// Opens a serializable unit of work. Dropping it without `commit` discards every write.
    async fn begin(&self) -> StoreResult<Box<dyn WarehouseTransaction>>;
}

/// A unit of work over warehouse rows. Either every staged write lands or none does.
#[async_trait]
pub trait WarehouseTransaction: Send {
    /// Reads the codes and holds their rows until commit or drop.
    async fn lock_codes(&mut self, codes: &[TrackingCode]) -> StoreResult<CodeSnapshot>;

    async fn lock_packing(&mut self, id: Uuid) -> StoreResult<Option<Packing>>;

    async fn insert_packing(&mut self, packing: &Packing) -> StoreResult<()>;

    async fn update_packing_status(
        &mut self,
        id: Uuid,
        status: PackingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn update_item_status(
        &mut self,
        code: &TrackingCode,
        status: WarehouseItemStatus,
    ) -> StoreResult<()>;

    async fn append_log(&mut self, entry: &ProcessLogEntry) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Append-only audit storage.
#[async_trait]
pub trait ProcessLogRepository: Send + Sync {
    async fn append(&self, entry: &ProcessLogEntry) -> StoreResult<()>;

    /// Entries for one subject in append order.
    async fn history(&self, subject: &Subject) -> StoreResult<Vec<ProcessLogEntry>>;
}
