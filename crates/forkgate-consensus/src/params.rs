use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_BLOCK1_BASE_SIZE, MAX_BLOCK1_SERIALIZED_SIZE, MAX_BLOCK1_SIGOPS_COST, MAX_BLOCK1_WEIGHT,
    MAX_TRANSACTION_BASE_SIZE, NO_TIMEOUT,
};
use crate::deployment::{DeploymentId, DeploymentParams, DeploymentRegistry};
use crate::error::ParamsError;

/// Network-fixed consensus constants for the block size rules. Each network
/// supplies its own values; nothing in the engine hard-codes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub network: String,
    #[serde(default = "default_base_size")]
    pub base_size_1x: u64,
    #[serde(default = "default_weight")]
    pub weight_1x: u64,
    #[serde(default = "default_sigop_cost")]
    pub sigop_cost_1x: u64,
    #[serde(default = "default_serialized_size")]
    pub serialized_size_1x: u64,
    #[serde(default = "default_tx_base_size")]
    pub max_tx_base_size: u64,
    /// Median-time-past (epoch seconds) at which the limits double.
    pub hard_fork_threshold: u64,
    pub deployments: Vec<DeploymentParams>,
}

fn default_base_size() -> u64 {
    MAX_BLOCK1_BASE_SIZE
}

fn default_weight() -> u64 {
    MAX_BLOCK1_WEIGHT
}

fn default_sigop_cost() -> u64 {
    MAX_BLOCK1_SIGOPS_COST
}

fn default_serialized_size() -> u64 {
    MAX_BLOCK1_SERIALIZED_SIZE
}

fn default_tx_base_size() -> u64 {
    MAX_TRANSACTION_BASE_SIZE
}

impl ConsensusParams {
    fn with_defaults(network: &str, hard_fork_threshold: u64, deployments: Vec<DeploymentParams>) -> Self {
        Self {
            network: network.to_string(),
            base_size_1x: MAX_BLOCK1_BASE_SIZE,
            weight_1x: MAX_BLOCK1_WEIGHT,
            sigop_cost_1x: MAX_BLOCK1_SIGOPS_COST,
            serialized_size_1x: MAX_BLOCK1_SERIALIZED_SIZE,
            max_tx_base_size: MAX_TRANSACTION_BASE_SIZE,
            hard_fork_threshold,
            deployments,
        }
    }

    pub fn mainnet() -> Self {
        Self::with_defaults(
            "main",
            1_514_764_800, // 2018-01-01T00:00:00Z
            vec![DeploymentParams {
                id: DeploymentId::SegwitAndLargerBlocks,
                bit: 4,
                start_time: 1_496_275_200, // 2017-06-01T00:00:00Z
                timeout: 1_512_086_400,    // 2017-12-01T00:00:00Z
                window: 2016,
                threshold: 1916,
            }],
        )
    }

    pub fn testnet() -> Self {
        Self::with_defaults(
            "test",
            1_509_494_400, // 2017-11-01T00:00:00Z
            vec![
                DeploymentParams {
                    id: DeploymentId::SegwitAndLargerBlocks,
                    bit: 4,
                    start_time: 1_493_596_800, // 2017-05-01T00:00:00Z
                    timeout: 1_509_494_400,
                    window: 2016,
                    threshold: 1512,
                },
                DeploymentParams {
                    id: DeploymentId::TestDummy,
                    bit: 28,
                    start_time: 1_199_145_601,
                    timeout: 1_230_767_999,
                    window: 2016,
                    threshold: 1512,
                },
            ],
        )
    }

    pub fn regtest() -> Self {
        Self::with_defaults(
            "regtest",
            1_510_000_000,
            vec![
                DeploymentParams {
                    id: DeploymentId::SegwitAndLargerBlocks,
                    bit: 4,
                    start_time: 0,
                    timeout: NO_TIMEOUT,
                    window: 144,
                    threshold: 108,
                },
                DeploymentParams {
                    id: DeploymentId::TestDummy,
                    bit: 28,
                    start_time: 0,
                    timeout: NO_TIMEOUT,
                    window: 144,
                    threshold: 108,
                },
            ],
        )
    }

    pub fn for_network(name: &str) -> Result<Self, ParamsError> {
        match name {
            "main" | "mainnet" => Ok(Self::mainnet()),
            "test" | "testnet" => Ok(Self::testnet()),
            "regtest" => Ok(Self::regtest()),
            other => Err(ParamsError::UnknownNetwork(other.to_string())),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ParamsError> {
        let params: ConsensusParams = serde_json::from_str(raw)?;
        params.registry()?;
        Ok(params)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParamsError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ParamsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Checks the limits and builds the deployment table. The combined
    /// segwit/larger-blocks deployment is mandatory.
    pub fn registry(&self) -> Result<DeploymentRegistry, ParamsError> {
        for (name, v) in [
            ("base_size_1x", self.base_size_1x),
            ("weight_1x", self.weight_1x),
            ("sigop_cost_1x", self.sigop_cost_1x),
            ("serialized_size_1x", self.serialized_size_1x),
            ("max_tx_base_size", self.max_tx_base_size),
        ] {
            if v == 0 {
                return Err(ParamsError::ZeroLimit(name));
            }
        }
        let registry = self
            .deployments
            .iter()
            .cloned()
            .fold(DeploymentRegistry::builder(), |b, d| b.deployment(d))
            .build()?;
        if registry.get(DeploymentId::SegwitAndLargerBlocks).is_none() {
            return Err(ParamsError::MissingDeployment(
                DeploymentId::SegwitAndLargerBlocks,
            ));
        }
        Ok(registry)
    }
}
