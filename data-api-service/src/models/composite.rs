use super::{AgentRecord, CollectionKind, CustomerRecord, OptionsRecord, PolicyRecord, Record};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Merged view of one customer across the four collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResponse {
    pub customer: Vec<CustomerRecord>,
    pub policy: Vec<PolicyRecord>,
    pub agent: Vec<AgentRecord>,
    pub options: Vec<OptionsRecord>,
}

/// Result of a single-collection lookup, serialized as `{"<collection>": [...]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRecords {
    pub collection: CollectionKind,
    pub records: Vec<Record>,
}

impl Serialize for CollectionRecords {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.collection.name(), &self.records)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_records_serialize_under_collection_name() {
        let empty = CollectionRecords {
            collection: CollectionKind::Agent,
            records: vec![],
        };
        assert_eq!(serde_json::to_value(&empty).unwrap(), json!({ "agent": [] }));
    }

    #[test]
    fn composite_has_exactly_four_keys() {
        let composite = CompositeResponse {
            customer: vec![],
            policy: vec![],
            agent: vec![],
            options: vec![],
        };
        let value = serde_json::to_value(&composite).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
        for key in ["customer", "policy", "agent", "options"] {
            assert!(keys.contains(&key));
        }
    }
}
