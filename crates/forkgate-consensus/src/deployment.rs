use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{NO_TIMEOUT, VERSIONBITS_NUM_BITS};
use crate::error::RegistryError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentId {
    /// Segregated witness bundled with the doubled block limits.
    SegwitAndLargerBlocks,
    TestDummy,
}

impl DeploymentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentId::SegwitAndLargerBlocks => "segwit_and_larger_blocks",
            DeploymentId::TestDummy => "test_dummy",
        }
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentParams {
    pub id: DeploymentId,
    pub bit: u8,
    /// Median-time-past at which signalling may begin (inclusive).
    pub start_time: u64,
    /// Median-time-past after which an unfinished deployment fails.
    #[serde(default = "no_timeout")]
    pub timeout: u64,
    pub window: u32,
    pub threshold: u32,
}

fn no_timeout() -> u64 {
    NO_TIMEOUT
}

impl DeploymentParams {
    pub fn mask(&self) -> u32 {
        1u32 << self.bit
    }

    fn overlaps(&self, other: &DeploymentParams) -> bool {
        self.start_time < other.timeout && other.start_time < self.timeout
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.bit >= VERSIONBITS_NUM_BITS {
            return Err(RegistryError::BitOutOfRange {
                id: self.id,
                bit: self.bit,
            });
        }
        if self.window == 0 {
            return Err(RegistryError::EmptyWindow(self.id));
        }
        if self.threshold == 0 || self.threshold > self.window {
            return Err(RegistryError::ThresholdOutOfRange {
                id: self.id,
                threshold: self.threshold,
                window: self.window,
            });
        }
        if self.timeout < self.start_time {
            return Err(RegistryError::TimeoutBeforeStart(self.id));
        }
        Ok(())
    }
}

/// Fixed table of soft-fork deployments for one network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeploymentRegistry {
    deployments: Vec<DeploymentParams>,
}

impl DeploymentRegistry {
    pub fn builder() -> DeploymentRegistryBuilder {
        DeploymentRegistryBuilder::default()
    }

    pub fn get(&self, id: DeploymentId) -> Option<&DeploymentParams> {
        self.deployments.iter().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeploymentParams> {
        self.deployments.iter()
    }

    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DeploymentRegistryBuilder {
    deployments: Vec<DeploymentParams>,
}

impl DeploymentRegistryBuilder {
    pub fn deployment(mut self, params: DeploymentParams) -> Self {
        self.deployments.push(params);
        self
    }

    /// Two deployments may reuse a bit only if their signalling periods cannot
    /// overlap; otherwise a set bit would count toward both.
    pub fn build(self) -> Result<DeploymentRegistry, RegistryError> {
        for (i, d) in self.deployments.iter().enumerate() {
            d.check()?;
            for other in &self.deployments[..i] {
                if other.id == d.id {
                    return Err(RegistryError::DuplicateDeployment(d.id));
                }
                if other.bit == d.bit && other.overlaps(d) {
                    return Err(RegistryError::BitCollision {
                        id: d.id,
                        other: other.id,
                        bit: d.bit,
                    });
                }
            }
        }
        let mut deployments = self.deployments;
        deployments.sort_by_key(|d| d.id);
        Ok(DeploymentRegistry { deployments })
    }
}
