//! Refs table types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// On-chain identity of one contract on one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    /// Code id assigned when the bytecode was stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_id: Option<String>,

    /// Address of the instantiated contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// network -> contract -> info
///
/// Ordered maps keep the serialized file stable across saves.
pub type RefsTable = BTreeMap<String, BTreeMap<String, ContractInfo>>;
