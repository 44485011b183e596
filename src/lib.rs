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

//! Bitmask ECS - sparse-set Entity Component System
//!
//! Entities are plain integer ids, components are columnar stores indexed by
//! id, and membership is a bit per component in per-world mask words.
//! Queries are compiled per world and kept current incrementally.

pub mod bitset;
pub mod component;
pub mod config;
pub mod debug;
pub mod entity;
pub mod error;
pub mod prelude;
#[cfg(feature = "profiling")]
pub mod profiling;
pub mod query;
pub mod sparse_set;
pub mod storage;
pub mod system;
pub mod universe;
pub mod world;


pub use component::*;
pub use config::*;
pub use debug::*;
pub use entity::*;
pub use error::*;
pub use query::*;
pub use sparse_set::*;
pub use storage::*;
pub use system::*;
pub use universe::*;
pub use world::*;
