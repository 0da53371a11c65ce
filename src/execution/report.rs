//! Serializable snapshot of a result tree.

use crate::execution::{ExecutionState, ResultId, ResultTree};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub description: String,
    pub state: ExecutionState,
    /// Messages ordered by key.
    pub messages: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub elapsed_ms: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResultReport>,
}

impl ResultReport {
    /// Snapshot the subtree rooted at `id`; `None` for a foreign id.
    pub fn from_tree(tree: &ResultTree, id: ResultId) -> Option<Self> {
        let node = tree.get(id)?;
        let children = node
            .children()
            .iter()
            .filter_map(|child| Self::from_tree(tree, *child))
            .collect();
        Some(Self {
            description: node.description().to_string(),
            state: node.state(),
            messages: node
                .messages()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            started_at: node.started_at(),
            completed_at: node.completed_at(),
            elapsed_ms: node.elapsed_ms(),
            children,
        })
    }

    /// Number of results in this report, itself included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ResultReport::count).sum::<usize>()
    }

    /// Count results per terminal state across the report.
    pub fn count_state(&self, state: ExecutionState) -> usize {
        let own = usize::from(self.state == state);
        own + self
            .children
            .iter()
            .map(|c| c.count_state(state))
            .sum::<usize>()
    }
}
