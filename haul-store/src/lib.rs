pub mod app_config;
pub mod database;
pub mod memory;
pub mod process_log_repo;
pub mod warehouse_repo;

pub use database::DbClient;
pub use memory::MemoryWarehouseStore;
pub use process_log_repo::PgProcessLogRepository;
pub use warehouse_repo::PgWarehouseStore;
