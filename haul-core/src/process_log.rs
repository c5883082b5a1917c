use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::status::{LifecycleStatus, StatusDomain};
use crate::CoreError;

/// What happened to the subject of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCode {
    PackingCreated,
    WarehouseItemPacked,
    PackingDispatched,
    WarehouseItemDispatched,
    StatusTransition,
}

impl ActionCode {
    pub const ALL: [ActionCode; 5] = [
        ActionCode::PackingCreated,
        ActionCode::WarehouseItemPacked,
        ActionCode::PackingDispatched,
        ActionCode::WarehouseItemDispatched,
        ActionCode::StatusTransition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCode::PackingCreated => "PACKING_CREATED",
            ActionCode::WarehouseItemPacked => "WAREHOUSE_ITEM_PACKED",
            ActionCode::PackingDispatched => "PACKING_DISPATCHED",
            ActionCode::WarehouseItemDispatched => "WAREHOUSE_ITEM_DISPATCHED",
            ActionCode::StatusTransition => "STATUS_TRANSITION",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == code)
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the staff member (or system) performing an action. Supplied by the
/// identity layer, never derived here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorRole(String);

impl ActorRole {
    pub fn new(role: impl Into<String>) -> Result<Self, CoreError> {
        let role = role.into();
        let trimmed = role.trim();
        if trimmed.is_empty() {
            return Err(CoreError::ValidationError("Actor role must not be blank".to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn system() -> Self {
        Self("SYSTEM".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The record a log entry is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub domain: StatusDomain,
    pub id: String,
}

impl Subject {
    pub fn new(domain: StatusDomain, id: impl Into<String>) -> Self {
        Self {
            domain,
            id: id.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDetail {
    /// `None` when the entry records a subject coming into existence.
    pub from: Option<String>,
    pub to: String,
}

/// Immutable audit record. Ordering within a subject is append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessLogEntry {
    pub id: Uuid,
    pub action: ActionCode,
    pub actor_role: ActorRole,
    pub subject: Subject,
    pub transition: Option<TransitionDetail>,
    pub recorded_at: DateTime<Utc>,
}

impl ProcessLogEntry {
    pub fn new(action: ActionCode, actor_role: ActorRole, subject: Subject) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            actor_role,
            subject,
            transition: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_transition<S: LifecycleStatus>(mut self, from: S, to: S) -> Self {
        self.transition = Some(TransitionDetail {
            from: Some(from.code().to_string()),
            to: to.code().to_string(),
        });
        self
    }

    /// Marks the status a subject was created in.
    pub fn with_initial_status<S: LifecycleStatus>(mut self, status: S) -> Self {
        self.transition = Some(TransitionDetail {
            from: None,
            to: status.code().to_string(),
        });
        self
    }

    /// Target status of the transition carried by this entry, if it parses in `S`.
    pub fn target_status<S: LifecycleStatus>(&self) -> Option<S> {
        if self.subject.domain != S::DOMAIN {
            return None;
        }
        self.transition
            .as_ref()
            .and_then(|t| S::from_code(&t.to).ok())
    }
}
