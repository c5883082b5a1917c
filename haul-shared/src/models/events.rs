use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PackingCreatedEvent {
    pub packing_id: Uuid,
    pub destination: String,
    pub tracking_codes: Vec<String>,
    pub actor_role: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PackingDispatchedEvent {
    pub packing_id: Uuid,
    pub destination: String,
    pub actor_role: String,
    pub timestamp: i64,
}

/// Broadcast after a packing commit lands. Delivery is best effort.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackingEvent {
    Created(PackingCreatedEvent),
    Dispatched(PackingDispatchedEvent),
}

impl PackingEvent {
    pub fn packing_id(&self) -> Uuid {
        match self {
            PackingEvent::Created(e) => e.packing_id,
            PackingEvent::Dispatched(e) => e.packing_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_by_kind() {
        let event = PackingEvent::Dispatched(PackingDispatchedEvent {
            packing_id: Uuid::nil(),
            destination: "HN-01".to_string(),
            actor_role: "WAREHOUSE".to_string(),
            timestamp: 1_700_000_000,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DISPATCHED");
        assert_eq!(json["destination"], "HN-01");
        assert_eq!(event.packing_id(), Uuid::nil());
    }
}
