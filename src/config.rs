// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Universe configuration

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

pub const DEFAULT_SIZE: usize = 100_000;
pub const DEFAULT_REMOVED_RECYCLE_THRESHOLD: f64 = 0.01;

/// Startup settings for a [`Universe`](crate::Universe)
///
/// ```
/// use bitmask_ecs::UniverseConfig;
///
/// let config = UniverseConfig::from_json(r#"{ "default_size": 5000 }"#).unwrap();
/// assert_eq!(config.default_size, 5000);
/// assert_eq!(config.removed_recycle_threshold, 0.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Capacity of new worlds and component stores
    pub default_size: usize,

    /// Fraction of `default_size` that must be waiting in the removed pool
    /// before ids are reused. Pick a value you would never remove in one frame.
    pub removed_recycle_threshold: f64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_SIZE,
            removed_recycle_threshold: DEFAULT_REMOVED_RECYCLE_THRESHOLD,
        }
    }
}

impl UniverseConfig {
    /// Parse and validate a JSON config. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_size == 0 {
            return Err(EcsError::ConfigError(
                "default_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.removed_recycle_threshold) {
            return Err(EcsError::ConfigError(format!(
                "removed_recycle_threshold must be within 0..=1, got {}",
                self.removed_recycle_threshold
            )));
        }
        Ok(())
    }
}
