use serde::{Deserialize, Serialize};
use std::fmt;

/// The four logical collections served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Customer,
    Policy,
    Agent,
    Options,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Customer,
        CollectionKind::Policy,
        CollectionKind::Agent,
        CollectionKind::Options,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CollectionKind::Customer => "customer",
            CollectionKind::Policy => "policy",
            CollectionKind::Agent => "agent",
            CollectionKind::Options => "options",
        }
    }

    /// Attribute the store shards this collection on.
    pub fn partition_key(&self) -> &'static str {
        match self {
            CollectionKind::Customer => "id",
            CollectionKind::Policy => "customerid",
            CollectionKind::Agent => "agent_no",
            CollectionKind::Options => "policyid",
        }
    }

    pub fn spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.name().to_string(),
            partition_key: self.partition_key().to_string(),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(CollectionKind::Customer),
            "policy" => Ok(CollectionKind::Policy),
            "agent" => Ok(CollectionKind::Agent),
            "options" => Ok(CollectionKind::Options),
            _ => Err(format!("Invalid collection: {}", s)),
        }
    }
}

/// Store-side definition of a collection: its name and partition-key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub partition_key: String,
}
