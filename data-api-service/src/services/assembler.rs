//! Composite record assembly.
//!
//! Policy and customer lookups run concurrently. The agent and options
//! lookups are keyed off the first policy found, so they wait for the policy
//! lookup and then run concurrently with each other.

use super::metrics::record_composite;
use super::records::RecordService;
use super::store::RecordQuery;
use crate::error::DataApiError;
use crate::models::{
    parse_records, AgentRecord, CollectionKind, CompositeResponse, CustomerRecord, OptionsRecord,
    PolicyRecord,
};

/// Cap applied to each of the four lookups.
pub const COMPOSITE_LIMIT: i64 = 10;

pub async fn assemble(
    records: &RecordService,
    customer_id: &str,
) -> Result<CompositeResponse, DataApiError> {
    let result = assemble_inner(records, customer_id).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(DataApiError::DependentLookupEmpty { .. }) => "no_policy",
        Err(DataApiError::MissingIdentifier) => "missing_id",
        Err(_) => "error",
    };
    record_composite(outcome);

    result
}

async fn assemble_inner(
    records: &RecordService,
    customer_id: &str,
) -> Result<CompositeResponse, DataApiError> {
    if customer_id.trim().is_empty() {
        return Err(DataApiError::MissingIdentifier);
    }

    tracing::info!(customer_id = %customer_id, "Build api response");

    let policy_query = RecordQuery::eq("customerid", customer_id).top(COMPOSITE_LIMIT);
    let customer_query = RecordQuery::eq("id", customer_id).top(COMPOSITE_LIMIT);

    let (policy, customer) = tokio::try_join!(
        records.query(CollectionKind::Policy, &policy_query),
        records.query(CollectionKind::Customer, &customer_query),
    )?;

    let policy: Vec<PolicyRecord> = parse_records(CollectionKind::Policy, policy)?;
    let customer: Vec<CustomerRecord> = parse_records(CollectionKind::Customer, customer)?;

    let Some(first) = policy.first() else {
        tracing::info!(customer_id = %customer_id, "No policy found, skipping agent and options lookups");
        return Err(DataApiError::DependentLookupEmpty {
            customer_id: customer_id.to_string(),
        });
    };

    let agent_query = RecordQuery::eq("agent_no", first.servingagentid.as_str()).top(COMPOSITE_LIMIT);
    let options_query = RecordQuery::eq("policyid", first.policyno.as_str()).top(COMPOSITE_LIMIT);

    let (agent, options) = tokio::try_join!(
        records.query(CollectionKind::Agent, &agent_query),
        records.query(CollectionKind::Options, &options_query),
    )?;

    let agent: Vec<AgentRecord> = parse_records(CollectionKind::Agent, agent)?;
    let options: Vec<OptionsRecord> = parse_records(CollectionKind::Options, options)?;

    Ok(CompositeResponse {
        customer,
        policy,
        agent,
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::services::catalog::provision;
    use crate::services::memory::InMemoryStore;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const DB: &str = "insurance";
    const CUSTOMER: &str = "LA-SG_21104577";

    async fn setup() -> (InMemoryStore, RecordService) {
        let store = InMemoryStore::new();
        let catalog = provision(&store, DB).await.unwrap();
        let records = RecordService::new(Arc::new(store.clone()), catalog);
        (store, records)
    }

    async fn seed(store: &InMemoryStore, kind: CollectionKind, record: Value) {
        store.insert(DB, &kind.spec(), record).await;
    }

    async fn seed_scenario(store: &InMemoryStore) {
        seed(
            store,
            CollectionKind::Policy,
            json!({ "policyno": "P1", "servingagentid": "AG1", "customerid": CUSTOMER }),
        )
        .await;
        seed(store, CollectionKind::Customer, json!({ "id": CUSTOMER })).await;
        seed(store, CollectionKind::Agent, json!({ "agent_no": "AG1" })).await;
        seed(store, CollectionKind::Options, json!({ "policyid": "P1" })).await;
    }

    #[tokio::test]
    async fn assembles_seeded_customer() {
        let (store, records) = setup().await;
        seed_scenario(&store).await;

        let composite = assemble(&records, CUSTOMER).await.unwrap();

        assert_eq!(
            serde_json::to_value(&composite).unwrap(),
            json!({
                "customer": [{ "id": CUSTOMER }],
                "policy": [{ "policyno": "P1", "servingagentid": "AG1", "customerid": CUSTOMER }],
                "agent": [{ "agent_no": "AG1" }],
                "options": [{ "policyid": "P1" }],
            })
        );
    }

    #[tokio::test]
    async fn cross_references_follow_first_policy() {
        let (store, records) = setup().await;
        seed_scenario(&store).await;
        // Unrelated rows that must not leak into the response.
        seed(&store, CollectionKind::Agent, json!({ "agent_no": "AG2" })).await;
        seed(&store, CollectionKind::Options, json!({ "policyid": "P9" })).await;

        let composite = assemble(&records, CUSTOMER).await.unwrap();

        assert_eq!(composite.policy.len(), 1);
        assert_eq!(composite.agent.len(), 1);
        assert_eq!(composite.options.len(), 1);
        assert_eq!(composite.agent[0].agent_no, composite.policy[0].servingagentid);
        assert_eq!(composite.options[0].policyid, composite.policy[0].policyno);
    }

    #[tokio::test]
    async fn no_policy_yields_dependent_lookup_empty() {
        let (store, records) = setup().await;
        seed(&store, CollectionKind::Customer, json!({ "id": CUSTOMER })).await;

        let err = assemble(&records, CUSTOMER).await.unwrap_err();
        match err {
            DataApiError::DependentLookupEmpty { customer_id } => assert_eq!(customer_id, CUSTOMER),
            other => panic!("unexpected error: {other:?}"),
        }

        // Agent and options are never queried.
        let mut log = store.query_log().await;
        log.sort();
        assert_eq!(log, vec!["customer", "policy"]);
    }

    #[tokio::test]
    async fn caps_policies_at_ten() {
        let (store, records) = setup().await;
        for n in 0..15 {
            seed(
                &store,
                CollectionKind::Policy,
                json!({ "policyno": format!("P{n}"), "servingagentid": "AG1", "customerid": CUSTOMER }),
            )
            .await;
        }

        let composite = assemble(&records, CUSTOMER).await.unwrap();
        assert_eq!(composite.policy.len(), 10);
        assert!(composite.customer.is_empty());
    }

    #[tokio::test]
    async fn store_failure_fails_whole_request() {
        let (store, records) = setup().await;
        seed_scenario(&store).await;
        store
            .set_failure(Some(StoreError::unavailable("connection reset by peer")))
            .await;

        let err = assemble(&records, CUSTOMER).await.unwrap_err();
        assert!(matches!(
            err,
            DataApiError::Store(StoreError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_policy_fails_fast() {
        let (store, records) = setup().await;
        seed(
            &store,
            CollectionKind::Policy,
            json!({ "policyno": "P1", "customerid": CUSTOMER }),
        )
        .await;

        let err = assemble(&records, CUSTOMER).await.unwrap_err();
        assert!(matches!(
            err,
            DataApiError::Store(StoreError::MalformedRecord { .. })
        ));
        let mut log = store.query_log().await;
        log.sort();
        assert_eq!(log, vec!["customer", "policy"]);
    }

    #[tokio::test]
    async fn blank_identifier_is_rejected() {
        let (store, records) = setup().await;

        let err = assemble(&records, "  ").await.unwrap_err();
        assert!(matches!(err, DataApiError::MissingIdentifier));
        assert!(store.query_log().await.is_empty());
    }
}
