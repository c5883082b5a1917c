use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::process_log::{ActorRole, Subject};
use crate::status::{PackingStatus, StatusDomain, WarehouseItemStatus};
use crate::CoreError;

/// Identifier assigned to a physical shipment at intake. Unique system-wide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Trims surrounding whitespace; blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a packing is bound, e.g. `HN-01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::ValidationError("Destination must not be blank".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl Dimensions {
    pub fn volume_cm3(&self) -> f64 {
        self.length_cm * self.width_cm * self.height_cm
    }
}

/// One received shipment. Never deleted, only status-advanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseItem {
    pub tracking_code: TrackingCode,
    pub destination_hint: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub weight_kg: Option<f64>,
    pub status: WarehouseItemStatus,
    pub order_link_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl WarehouseItem {
    pub fn new(tracking_code: TrackingCode, status: WarehouseItemStatus) -> Self {
        Self {
            tracking_code,
            destination_hint: None,
            dimensions: None,
            weight_kg: None,
            status,
            order_link_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_destination_hint(mut self, hint: impl Into<String>) -> Self {
        self.destination_hint = Some(hint.into());
        self
    }

    pub fn with_order_link(mut self, order_link_id: Uuid) -> Self {
        self.order_link_id = Some(order_link_id);
        self
    }

    pub fn subject(&self) -> Subject {
        Subject::new(StatusDomain::WarehouseItem, self.tracking_code.as_str())
    }
}

/// A consolidation unit bound for one destination.
///
/// Immutable once created apart from the move to `Dispatched`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packing {
    pub id: Uuid,
    pub destination: Destination,
    pub tracking_codes: Vec<TrackingCode>,
    pub status: PackingStatus,
    pub created_by: ActorRole,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl Packing {
    pub fn new(destination: Destination, tracking_codes: Vec<TrackingCode>, created_by: ActorRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination,
            tracking_codes,
            status: PackingStatus::Created,
            created_by,
            created_at: Utc::now(),
            dispatched_at: None,
        }
    }

    /// An active packing holds its codes exclusively.
    pub fn is_active(&self) -> bool {
        self.status == PackingStatus::Created
    }

    pub fn subject(&self) -> Subject {
        Subject::new(StatusDomain::Packing, self.id.to_string())
    }
}

/// What storage knows about one tracking code at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeState {
    pub item: WarehouseItem,
    /// Set when an active packing already references the code.
    pub active_packing: Option<Uuid>,
}

/// Known codes only; a code absent from the map does not exist in the system.
pub type CodeSnapshot = HashMap<TrackingCode, CodeState>;
