pub mod composite;
pub mod health;
pub mod legacy;
pub mod records;

pub use composite::get_composite;
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use legacy::legacy_api;
pub use records::{agent_by_id, customer_by_id, options_by_id, policy_by_id, read_record};
