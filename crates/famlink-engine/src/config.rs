//! Engine configuration.

use serde::{Deserialize, Serialize};

use famlink_state::{LinkPolicy, PolicyError};

/// Construction-time settings of a [`LifecycleEngine`](crate::LifecycleEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempt ceiling and cooldown lengths.
    pub policy: LinkPolicy,
    /// Extra read-decide-write attempts after a store conflict.
    pub max_conflict_retries: u32,
}

impl EngineConfig {
    pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

    pub fn with_policy(policy: LinkPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        self.policy.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: LinkPolicy::default(),
            max_conflict_retries: Self::DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}
