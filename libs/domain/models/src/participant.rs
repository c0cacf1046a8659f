// [libs/domain/models/src/participant.rs]
//! The set of known participants in an analysis, learned at startup
//! from `GET /analyses/{aid}/participants`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::NodeRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub node_id: String,
    #[serde(rename = "nodeType")]
    pub node_type: NodeRole,
}

/// Participants keyed by `node_id`. Invariant: at most one entry has
/// `node_type == Aggregator`.
#[derive(Debug, Clone, Default)]
pub struct ParticipantSet {
    by_id: HashMap<String, ParticipantInfo>,
}

impl ParticipantSet {
    pub fn from_entries(entries: Vec<ParticipantInfo>) -> Self {
        let by_id = entries.into_iter().map(|p| (p.node_id.clone(), p)).collect();
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, node_id: &str) -> Option<&ParticipantInfo> {
        self.by_id.get(node_id)
    }

    /// The unique aggregator, if the set currently contains one.
    pub fn aggregator(&self) -> Option<&ParticipantInfo> {
        self.by_id.values().find(|p| p.node_type.is_aggregator())
    }

    /// Every participant that is not the aggregator.
    pub fn analyzers(&self) -> impl Iterator<Item = &ParticipantInfo> {
        self.by_id.values().filter(|p| !p.node_type.is_aggregator())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }
}

/// One entry of `GET /kong/datastore/{projectId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, role: NodeRole) -> ParticipantInfo {
        ParticipantInfo { node_id: id.into(), node_type: role }
    }

    #[test]
    fn finds_unique_aggregator() {
        let set = ParticipantSet::from_entries(vec![
            info("a1", NodeRole::Default),
            info("g", NodeRole::Aggregator),
            info("a2", NodeRole::Default),
        ]);
        assert_eq!(set.aggregator().unwrap().node_id, "g");
        assert_eq!(set.analyzers().count(), 2);
    }

    #[test]
    fn no_aggregator_is_none() {
        let set = ParticipantSet::from_entries(vec![info("a1", NodeRole::Default)]);
        assert!(set.aggregator().is_none());
    }
}
