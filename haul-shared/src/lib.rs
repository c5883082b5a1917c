pub mod models;

pub use models::events::{PackingCreatedEvent, PackingDispatchedEvent, PackingEvent};
