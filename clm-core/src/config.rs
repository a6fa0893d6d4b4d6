//! Chain and deployment configuration.
//!
//! A persisted deployment descriptor (written by the deployment tooling, not
//! by this crate) may override which schema uid and chain are active. Its
//! absence is normal and falls back to the built-in per-chain defaults; it
//! never causes a hard failure.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Base Sepolia chain id.
pub const BASE_SEPOLIA: u64 = 84532;
/// Base mainnet chain id.
pub const BASE_MAINNET: u64 = 8453;

/// Default deployment descriptor filename.
pub const DEPLOYMENT_FILE: &str = "clm-deployment.json";

/// Endpoints and schema for one chain's attestation index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EVM chain id.
    pub chain_id: u64,
    /// GraphQL endpoint of the attestation index.
    pub graphql: String,
    /// Attestation explorer base URL.
    pub explorer: String,
    /// Schema uid of the document's record schema; `None` until deployed.
    pub schema_uid: Option<String>,
}

impl ChainConfig {
    /// Base Sepolia defaults, the active testnet deployment.
    pub fn base_sepolia() -> Self {
        Self {
            chain_id: BASE_SEPOLIA,
            graphql: "https://base-sepolia.easscan.org/graphql".into(),
            explorer: "https://base-sepolia.easscan.org/attestation/view".into(),
            schema_uid: Some(
                "0xcac2a4177f75d29f7fef657aa221e510d888785ed7b1b2d16497ae839928fb05".into(),
            ),
        }
    }

    /// Base mainnet defaults. No schema deployed there yet.
    pub fn base_mainnet() -> Self {
        Self {
            chain_id: BASE_MAINNET,
            graphql: "https://base.easscan.org/graphql".into(),
            explorer: "https://base.easscan.org/attestation/view".into(),
            schema_uid: None,
        }
    }
}

/// Built-in configuration for a known chain.
pub fn chain_config(chain_id: u64) -> Option<ChainConfig> {
    match chain_id {
        BASE_SEPOLIA => Some(ChainConfig::base_sepolia()),
        BASE_MAINNET => Some(ChainConfig::base_mainnet()),
        _ => None,
    }
}

/// Persisted deployment descriptor, as written by the deployment tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    /// Chain the schema was deployed to.
    pub chain_id: u64,
    /// Deployed schema uid.
    pub schema_uid: String,
    /// Address that registered the schema, if recorded.
    #[serde(default)]
    pub attester: Option<String>,
}

/// Load the deployment descriptor if present.
///
/// A missing file is the normal case and returns `None` quietly; a present
/// but unreadable or malformed file is logged and also degrades to `None`
/// rather than failing the run.
pub fn load_deployment(path: impl AsRef<Path>) -> Option<DeploymentInfo> {
    let path = path.as_ref();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No deployment descriptor, using defaults");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read deployment descriptor");
            return None;
        }
    };
    match serde_json::from_str::<DeploymentInfo>(&raw) {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed deployment descriptor ignored");
            None
        }
    }
}

/// Resolve the active chain configuration.
///
/// Starts from the built-in defaults (Base Sepolia) and applies the
/// deployment descriptor override when one is present and names a known
/// chain.
pub fn active_config(descriptor_path: impl AsRef<Path>) -> ChainConfig {
    let mut config = ChainConfig::base_sepolia();

    if let Some(info) = load_deployment(descriptor_path) {
        if let Some(mut chain) = chain_config(info.chain_id) {
            chain.schema_uid = Some(info.schema_uid.clone());
            config = chain;
            tracing::info!(
                chain_id = info.chain_id,
                schema = %info.schema_uid,
                "Using deployed schema from descriptor"
            );
        } else {
            tracing::warn!(
                chain_id = info.chain_id,
                "Deployment descriptor names unknown chain, using defaults"
            );
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_chains() {
        let sepolia = chain_config(BASE_SEPOLIA).unwrap();
        assert!(sepolia.schema_uid.is_some());
        let mainnet = chain_config(BASE_MAINNET).unwrap();
        assert!(mainnet.schema_uid.is_none());
        assert!(chain_config(1).is_none());
    }

    #[test]
    fn test_missing_descriptor_falls_back() {
        let config = active_config("/nonexistent/clm-deployment.json");
        assert_eq!(config.chain_id, BASE_SEPOLIA);
        assert!(config.schema_uid.is_some());
    }

    #[test]
    fn test_descriptor_overrides_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEPLOYMENT_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"chainId": 84532, "schemaUid": "0xabc", "attester": "0xdef"}}"#
        )
        .unwrap();

        let config = active_config(&path);
        assert_eq!(config.schema_uid.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_malformed_descriptor_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEPLOYMENT_FILE);
        std::fs::write(&path, "not json").unwrap();

        let config = active_config(&path);
        assert_eq!(config.chain_id, BASE_SEPOLIA);
    }
}
