use std::sync::Arc;
use haul_core::{ProcessLogRepository, WarehouseStore};
use haul_order::{OrderLifecycleEngine, PackingConsolidator, PackingValidationService, ProcessLogRecorder};
use haul_shared::PackingEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub warehouse: Arc<dyn WarehouseStore>,
    pub validation: PackingValidationService,
    pub consolidator: PackingConsolidator,
    pub recorder: ProcessLogRecorder,
    pub events_tx: broadcast::Sender<PackingEvent>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wires the packing services over one storage backend.
    pub fn new(
        warehouse: Arc<dyn WarehouseStore>,
        process_log: Arc<dyn ProcessLogRepository>,
        auth: AuthConfig,
        channel_capacity: usize,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(channel_capacity);
        let recorder = ProcessLogRecorder::new(process_log);
        let engine = OrderLifecycleEngine::new(recorder.clone());

        Self {
            validation: PackingValidationService::new(warehouse.clone()),
            consolidator: PackingConsolidator::new(warehouse.clone(), engine).with_events(events_tx.clone()),
            warehouse,
            recorder,
            events_tx,
            auth,
        }
    }
}
