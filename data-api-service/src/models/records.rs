//! Typed views over store records.
//!
//! Records come back from the store as JSON objects. The fields the API
//! depends on are parsed into typed structs right at the query boundary;
//! everything else is carried along untouched in `attributes`.

use super::CollectionKind;
use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record as stored: one JSON object.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub policyno: String,
    pub servingagentid: String,
    pub customerid: String,
    #[serde(flatten)]
    pub attributes: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_no: String,
    #[serde(flatten)]
    pub attributes: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsRecord {
    pub policyid: String,
    #[serde(flatten)]
    pub attributes: Record,
}

/// Parses raw records into `T`, failing on the first record that does not fit.
pub fn parse_records<T: DeserializeOwned>(
    kind: CollectionKind,
    records: Vec<Record>,
) -> Result<Vec<T>, StoreError> {
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(Value::Object(record)).map_err(|e| {
                StoreError::MalformedRecord {
                    collection: kind.name().to_string(),
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn policy_keeps_extra_attributes() {
        let raw = record(json!({
            "policyno": "P1",
            "servingagentid": "AG1",
            "customerid": "C1",
            "premium": 1200,
            "status": "active"
        }));

        let parsed: Vec<PolicyRecord> = parse_records(CollectionKind::Policy, vec![raw]).unwrap();
        assert_eq!(parsed[0].policyno, "P1");
        assert_eq!(parsed[0].attributes["premium"], 1200);

        let back = serde_json::to_value(&parsed[0]).unwrap();
        assert_eq!(back["servingagentid"], "AG1");
        assert_eq!(back["status"], "active");
    }

    #[test]
    fn policy_missing_serving_agent_is_malformed() {
        let raw = record(json!({ "policyno": "P1", "customerid": "C1" }));

        let err = parse_records::<PolicyRecord>(CollectionKind::Policy, vec![raw]).unwrap_err();
        match err {
            StoreError::MalformedRecord { collection, reason } => {
                assert_eq!(collection, "policy");
                assert!(reason.contains("servingagentid"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_string_key_field_is_malformed() {
        let raw = record(json!({ "agent_no": 42 }));
        assert!(parse_records::<AgentRecord>(CollectionKind::Agent, vec![raw]).is_err());
    }
}
