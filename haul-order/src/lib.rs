pub mod models;
pub mod audit;
pub mod lifecycle;
pub mod classifier;
pub mod validation;
pub mod consolidator;

pub use models::{Order, OrderLink, Payment, Purchase};
pub use audit::ProcessLogRecorder;
pub use lifecycle::{Lifecycle, LifecycleError, OrderLifecycleEngine};
pub use classifier::{Classification, CodeBatch, CodeEntry, CodeVerdict, TrackingCodeClassifier};
pub use validation::{PackingValidationService, RejectionReason, ValidationResult};
pub use consolidator::{PackingConsolidator, PackingError};
