pub mod collection;
pub mod composite;
pub mod records;

pub use collection::{CollectionKind, CollectionSpec};
pub use composite::{CollectionRecords, CompositeResponse};
pub use records::{parse_records, AgentRecord, CustomerRecord, OptionsRecord, PolicyRecord, Record};
