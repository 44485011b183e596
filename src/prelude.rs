//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use bitmask_ecs::prelude::*;
//! ```

pub use crate::component::ComponentId;
pub use crate::config::UniverseConfig;
pub use crate::debug::WorldInspector;
pub use crate::entity::EntityId;
pub use crate::error::{EcsError, Result};
pub use crate::query::{changed, not, QueryId, QueryTerm};
pub use crate::storage::{FieldKind, Schema};
pub use crate::system::{define_system, Pipeline, System};
pub use crate::universe::Universe;
pub use crate::world::{World, WorldId};
