// [libs/core/sdk/src/config.rs]
//! Node configuration (C1): environment-derived identity, read once at
//! bootstrap. The ingress host is derived from `DEPLOYMENT_NAME` as
//! `nginx-{deployment_name}` — every platform service hangs off that
//! same nginx reverse proxy under its own path prefix
//! (`/message-broker`, `/storage`, `/po`, `/kong`, `/hub-adapter`).
//! Configuracion leida una sola vez, al arranque.

use std::env;

use flame_domain_models::NodeCredentials;

use crate::errors::ConfigError;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub analysis_id: String,
    pub project_id: String,
    pub ingress_host: String,
    pub credentials: NodeCredentials,
}

impl NodeConfig {
    /// Reads `ANALYSIS_ID`, `PROJECT_ID`, `DEPLOYMENT_NAME`,
    /// `KEYCLOAK_TOKEN`, `DATA_SOURCE_TOKEN` (spec.md §6). Loads a
    /// `.env` file first if one is present; real environment variables
    /// still take precedence.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let analysis_id = required_env("ANALYSIS_ID")?;
        let project_id = required_env("PROJECT_ID")?;
        let deployment_name = required_env("DEPLOYMENT_NAME")?;
        let platform_token = required_env("KEYCLOAK_TOKEN")?;
        let data_source_token = required_env("DATA_SOURCE_TOKEN")?;

        Ok(Self {
            analysis_id,
            project_id,
            ingress_host: format!("nginx-{deployment_name}"),
            credentials: NodeCredentials { platform_token, data_source_token },
        })
    }
}

fn required_env(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnv(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_is_reported_by_name() {
        let err = required_env("FLAME_SDK_TEST_VAR_THAT_DOES_NOT_EXIST").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("FLAME_SDK_TEST_VAR_THAT_DOES_NOT_EXIST")));
    }

    #[test]
    fn ingress_host_is_the_nginx_prefixed_deployment_name() {
        std::env::set_var("ANALYSIS_ID", "a1");
        std::env::set_var("PROJECT_ID", "p1");
        std::env::set_var("DEPLOYMENT_NAME", "dep-1");
        std::env::set_var("KEYCLOAK_TOKEN", "tok");
        std::env::set_var("DATA_SOURCE_TOKEN", "ds-tok");
        let config = NodeConfig::from_env().unwrap();
        assert_eq!(config.ingress_host, "nginx-dep-1");
        std::env::remove_var("ANALYSIS_ID");
        std::env::remove_var("PROJECT_ID");
        std::env::remove_var("DEPLOYMENT_NAME");
        std::env::remove_var("KEYCLOAK_TOKEN");
        std::env::remove_var("DATA_SOURCE_TOKEN");
    }
}
