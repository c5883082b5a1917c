pub mod status;
pub mod process_log;
pub mod warehouse;
pub mod repository;

pub use process_log::{ActionCode, ActorRole, ProcessLogEntry, Subject, TransitionDetail};
pub use repository::{ProcessLogRepository, StoreError, StoreResult, WarehouseStore, WarehouseTransaction};
pub use status::{
    ColorTag, LifecycleStatus, OrderLinkStatus, OrderStatus, PackingStatus, PaymentStatus,
    PurchaseStatus, StatusDomain, StatusMeta, StatusRegistry, UnknownStatus, WarehouseItemStatus,
};
pub use warehouse::{CodeSnapshot, CodeState, Destination, Dimensions, Packing, TrackingCode, WarehouseItem};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
