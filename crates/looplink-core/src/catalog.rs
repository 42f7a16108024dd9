//! Reward catalog: static table of reward code → sticker cost.
//!
//! Read-only configuration. The engine only ever looks costs up; there
//! is no mutation API.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Mapping of reward code to its sticker cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RewardCatalog {
    rewards: HashMap<String, u64>,
}

impl RewardCatalog {
    /// Build a catalog from an explicit table.
    ///
    /// Rejects empty tables and non-positive costs so a misconfigured
    /// deployment fails at load time rather than at redemption time.
    pub fn new(rewards: HashMap<String, u64>) -> Result<Self, LedgerError> {
        if rewards.is_empty() {
            return Err(LedgerError::Catalog(
                "catalog must define at least one reward".to_string(),
            ));
        }
        if let Some(code) = rewards
            .iter()
            .find_map(|(code, cost)| (*cost == 0).then_some(code))
        {
            return Err(LedgerError::Catalog(format!(
                "reward '{code}' has a zero sticker cost"
            )));
        }
        Ok(Self { rewards })
    }

    /// Parse a catalog from a JSON object of `{"CODE": cost}` entries.
    pub fn from_json(raw: &str) -> Result<Self, LedgerError> {
        let rewards: HashMap<String, u64> = serde_json::from_str(raw)
            .map_err(|e| LedgerError::Catalog(format!("malformed catalog JSON: {e}")))?;
        Self::new(rewards)
    }

    /// Load a catalog from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Catalog(format!("read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Sticker cost of a reward, or `None` for unknown codes.
    pub fn cost(&self, reward_code: &str) -> Option<u64> {
        self.rewards.get(reward_code).copied()
    }

    pub fn contains(&self, reward_code: &str) -> bool {
        self.rewards.contains_key(reward_code)
    }

    /// Reward codes and costs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.rewards.iter().map(|(code, cost)| (code.as_str(), *cost))
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

impl Default for RewardCatalog {
    /// The stock reward table.
    fn default() -> Self {
        let rewards = HashMap::from([
            ("MUG".to_string(), 10),
            ("TOTE".to_string(), 20),
            ("HOODIE".to_string(), 50),
            ("STICKER_PACK".to_string(), 5),
            ("FERARI".to_string(), 10_000),
        ]);
        Self { rewards }
    }
}
