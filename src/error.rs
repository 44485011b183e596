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

//! Error types

use std::fmt;

use crate::component::ComponentId;
use crate::entity::EntityId;
use crate::query::QueryId;
use crate::storage::FieldKind;

/// ECS error type
///
/// Every variant is a caller mistake. Idempotent requests (adding a component
/// twice, removing a missing one) are not errors and never produce these.
#[derive(Debug, Clone, PartialEq)]
pub enum EcsError {
    /// World handle is stale or was never created
    WorldNotFound,

    /// Entity does not exist in the world
    EntityNotFound(EntityId),

    /// Component id was never defined in this universe
    ComponentNotFound(ComponentId),

    /// Query id was never defined in this universe
    QueryNotFound(QueryId),

    /// Entity id would not fit inside the world
    CapacityExceeded { attempted: usize, capacity: usize },

    /// `flush_removed_entities` called on a world without manual recycling
    ManualRecyclingDisabled,

    /// Schema has no field with this name
    FieldNotFound(String),

    /// Field exists but is stored as a different kind
    FieldTypeMismatch { field: String, expected: FieldKind },

    /// Configuration could not be parsed or is out of range
    ConfigError(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::WorldNotFound => write!(f, "World not found"),
            EcsError::EntityNotFound(entity) => {
                write!(f, "Entity {entity} does not exist in the world")
            }
            EcsError::ComponentNotFound(id) => write!(f, "Component {id:?} not found"),
            EcsError::QueryNotFound(id) => write!(f, "Query {id:?} not found"),
            EcsError::CapacityExceeded { attempted, capacity } => {
                write!(
                    f,
                    "Max entities reached: attempted id {attempted}, capacity is {capacity}"
                )
            }
            EcsError::ManualRecyclingDisabled => write!(
                f,
                "Cannot flush removed entities, enable manual entity recycling first"
            ),
            EcsError::FieldNotFound(name) => write!(f, "Field not found: {name}"),
            EcsError::FieldTypeMismatch { field, expected } => {
                write!(f, "Field {field} is stored as {expected:?}")
            }
            EcsError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        EcsError::ConfigError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = EcsError::CapacityExceeded {
            attempted: 10,
            capacity: 10,
        };
        assert_eq!(
            err.to_string(),
            "Max entities reached: attempted id 10, capacity is 10"
        );
        assert_eq!(
            EcsError::EntityNotFound(EntityId::new(7)).to_string(),
            "Entity 7 does not exist in the world"
        );
    }
}
