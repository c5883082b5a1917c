use haul_core::{CodeSnapshot, Destination, StoreError, TrackingCode, WarehouseStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::classifier::{CodeBatch, CodeEntry, TrackingCodeClassifier};

/// Why a batch cannot become a packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    InvalidCode,
    NotImported,
    AlreadyPacked,
    EmptyBatch,
}

/// Everything the operator needs to fix a batch, or the go-ahead to create it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub destination: Destination,
    pub valid_codes: Vec<TrackingCode>,
    pub valid_count: usize,
    pub warehouse_count: usize,
    pub invalid_codes: Vec<TrackingCode>,
    pub not_imported_codes: Vec<TrackingCode>,
    pub already_packed_codes: Vec<TrackingCode>,
    /// Per-position verdicts in input order, repeats included.
    pub entries: Vec<CodeEntry>,
    pub can_create: bool,
    pub message: String,
}

impl ValidationResult {
    /// Classifies `batch` against `snapshot`. Shared by the read-only check
    /// and the locked re-check done at creation time.
    pub fn evaluate(destination: &Destination, batch: &CodeBatch, snapshot: &CodeSnapshot) -> Self {
        if batch.is_empty() {
            return Self::empty(destination);
        }

        let classification = TrackingCodeClassifier::classify(batch, snapshot);
        let can_create = !classification.has_errors() && !classification.valid.is_empty();

        let mut result = Self {
            destination: destination.clone(),
            valid_count: classification.valid.len(),
            valid_codes: classification.valid,
            warehouse_count: classification.warehouse_count,
            invalid_codes: classification.invalid,
            not_imported_codes: classification.not_imported,
            already_packed_codes: classification.already_packed,
            entries: classification.entries,
            can_create,
            message: String::new(),
        };
        result.message = result.summarize();
        result
    }

    pub fn empty(destination: &Destination) -> Self {
        Self {
            destination: destination.clone(),
            valid_codes: Vec::new(),
            valid_count: 0,
            warehouse_count: 0,
            invalid_codes: Vec::new(),
            not_imported_codes: Vec::new(),
            already_packed_codes: Vec::new(),
            entries: Vec::new(),
            can_create: false,
            message: "No tracking codes supplied".to_string(),
        }
    }

    /// Empty when `can_create` is true.
    pub fn reasons(&self) -> Vec<RejectionReason> {
        let mut reasons = Vec::new();
        if self.entries.is_empty() {
            reasons.push(RejectionReason::EmptyBatch);
        }
        if !self.invalid_codes.is_empty() {
            reasons.push(RejectionReason::InvalidCode);
        }
        if !self.not_imported_codes.is_empty() {
            reasons.push(RejectionReason::NotImported);
        }
        if !self.already_packed_codes.is_empty() {
            reasons.push(RejectionReason::AlreadyPacked);
        }
        reasons
    }

    fn summarize(&self) -> String {
        if self.can_create {
            return format!(
                "{} tracking code(s) ready to pack for {}",
                self.valid_count, self.destination
            );
        }

        let mut problems = Vec::new();
        if !self.invalid_codes.is_empty() {
            problems.push(format!("{} not found", self.invalid_codes.len()));
        }
        if !self.not_imported_codes.is_empty() {
            problems.push(format!("{} not in warehouse", self.not_imported_codes.len()));
        }
        if !self.already_packed_codes.is_empty() {
            problems.push(format!("{} already packed", self.already_packed_codes.len()));
        }
        format!("Cannot create packing for {}: {}", self.destination, problems.join(", "))
    }
}

/// Read-only pre-flight check of a candidate batch.
#[derive(Clone)]
pub struct PackingValidationService {
    store: Arc<dyn WarehouseStore>,
}

impl PackingValidationService {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self { store }
    }

    /// Fails only when storage does. Business-rule problems come back as data.
    pub async fn check<S: AsRef<str>>(
        &self,
        destination: &Destination,
        codes: &[S],
    ) -> Result<ValidationResult, StoreError> {
        let batch = CodeBatch::from_raw(codes);
        if batch.is_empty() {
            return Ok(ValidationResult::empty(destination));
        }

        let snapshot = self.store.snapshot(&batch.distinct).await?;
        let result = ValidationResult::evaluate(destination, &batch, &snapshot);

        tracing::debug!(
            "Checked {} code(s) for {}: {} valid, can_create={}",
            batch.distinct.len(),
            destination,
            result.valid_count,
            result.can_create
        );
        Ok(result)
    }
}
