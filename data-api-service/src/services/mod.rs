pub mod assembler;
pub mod catalog;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod records;
pub mod store;

pub use assembler::{assemble, COMPOSITE_LIMIT};
pub use catalog::{provision, provision_with_retry, Catalog};
pub use database::MongoStore;
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use records::RecordService;
pub use store::{CollectionHandle, DatabaseHandle, DocumentStore, RecordQuery};
