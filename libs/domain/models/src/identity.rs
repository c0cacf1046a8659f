// [libs/domain/models/src/identity.rs]
//! Node identity: set exactly once by the broker handshake, read-only after.
//! Identidad soberana del nodo — inmutable tras el handshake.

use serde::{Deserialize, Serialize};

/// A node's role in the star topology. `Default` covers the plain
/// analyzer participants; `Aggregator` is unique per analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Aggregator,
    Default,
}

impl NodeRole {
    pub fn is_aggregator(self) -> bool {
        matches!(self, NodeRole::Aggregator)
    }
}

/// Bearer tokens this node authenticates to platform services with.
/// Both are swapped atomically on `/token_refresh`; never logged.
/// Credenciales del nodo — jamas se registran en claro.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCredentials {
    pub platform_token: String,
    pub data_source_token: String,
}

impl std::fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeIdentity")
            .field("analysis_id", &self.analysis_id)
            .field("project_id", &self.project_id)
            .field("node_id", &self.node_id)
            .field("role", &self.role)
            .field("ingress_host", &self.ingress_host)
            .field("credentials", &"<redacted>")
            .finish()
    }
}

/// Immutable node identity. `node_id` and `role` start unset
/// (populated only after the broker handshake in bootstrap step 3);
/// every other field is known from the environment at construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub analysis_id: String,
    pub project_id: String,
    pub ingress_host: String,
    pub node_id: String,
    pub role: NodeRole,
    pub credentials: NodeCredentials,
}

impl NodeIdentity {
    /// Constructs a provisional identity before the handshake has run.
    /// `node_id`/`role` are placeholders until `finalize` is called.
    pub fn provisional(
        analysis_id: String,
        project_id: String,
        ingress_host: String,
        credentials: NodeCredentials,
    ) -> Self {
        Self {
            analysis_id,
            project_id,
            ingress_host,
            node_id: String::new(),
            role: NodeRole::Default,
            credentials,
        }
    }

    /// Applies the broker handshake result. Called exactly once.
    pub fn finalize(&mut self, node_id: String, role: NodeRole) {
        self.node_id = node_id;
        self.role = role;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&NodeRole::Aggregator).unwrap(), "\"aggregator\"");
        assert_eq!(serde_json::to_string(&NodeRole::Default).unwrap(), "\"default\"");
    }

    #[test]
    fn identity_debug_redacts_credentials() {
        let identity = NodeIdentity::provisional(
            "a".into(),
            "p".into(),
            "host".into(),
            NodeCredentials { platform_token: "secret-token".into(), data_source_token: "ds-secret".into() },
        );
        let rendered = format!("{:?}", identity);
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("ds-secret"));
    }
}
