/*
 * ECS Inspector - Library
 * Copyright (C) 2025 the ecs-inspector authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! # ECS Inspector
//!
//! Live entity/component introspection core for ECS hosts: lazily-expanded
//! inspection trees, incremental per-frame refresh, entity-graph snapshots,
//! and structural component queries.
//!
//! The crate runs entirely inside the host's main-thread per-frame update
//! callback: no threads, no async, no locks. It never mutates the world;
//! every host interaction goes through the read-only [`host::LiveDataSource`]
//! contract, and type shapes come from an explicit [`schema::SchemaRegistry`]
//! instead of runtime reflection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecs_inspector::prelude::*;
//!
//! # fn frame(world: &dyn LiveDataSource) {
//! // Describe the host types once, at startup.
//! let mut registry = SchemaRegistry::new();
//! registry.register_struct(
//!     "Position",
//!     vec![
//!         RawFieldInfo::new("x", "f32", FieldShape::Scalar),
//!         RawFieldInfo::new("y", "f32", FieldShape::Scalar),
//!     ],
//! );
//! let mut descriptor = TypeDescriptor::new(Box::new(registry));
//!
//! let config = InspectorConfig::default();
//! let snapshots = SnapshotStore::new();
//! let mut inspector = EntityInspector::new(42, InspectionMode::Live);
//!
//! // Every frame: refresh, render, route input back.
//! inspector.refresh(&mut descriptor, world, &snapshots, &config);
//! for row in inspector.rows(&config) {
//!     // hand the row to the UI layer
//! }
//! # }
//! ```
//!
//! ## Core Modules
//!
//! ### Structure discovery
//! - [`schema`] - explicit type schemas standing in for host reflection
//! - [`type_descriptor`] - cached, deny-listed field discovery
//!
//! ### The inspection tree
//! - [`tree`] - arena-backed node storage with generation-checked ids
//! - [`builder`] - node-kind dispatch and the depth guard
//! - [`refresh`] - incremental per-frame value refresh
//! - [`view`] - row emission and user intents
//! - [`inspector`] - per-view facade
//!
//! ### Snapshots and queries
//! - [`snapshot`] - transitive-closure entity graph capture
//! - [`query`] - all/any/none component-set predicates
//! - [`diff`] - snapshot-vs-live comparison
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, Error>`](error::Error). Nothing
//! in the per-frame path propagates errors across the public boundary:
//! transient host read failures are logged and absorbed into node state
//! (stale value, disabled affordance, placeholder text).

// Re-export commonly used types
pub mod prelude {
    //! Common imports for typical usage
    pub use crate::config::InspectorConfig;
    pub use crate::diff::{diff_against_live, SnapshotDiff};
    pub use crate::error::{Error, Result};
    pub use crate::host::{ComponentValue, EntityId, LiveDataSource, NULL_ENTITY};
    pub use crate::inspector::{EntityInspector, InspectionMode};
    pub use crate::query::{QueryPredicate, ValidatedQuery};
    pub use crate::schema::{
        FieldShape, RawFieldInfo, ReflectionProvider, SchemaRegistry, TypeCategory, TypeHandle,
        TypeSchema,
    };
    pub use crate::snapshot::{CapturedComponent, EntitySnapshotData, SnapshotStore};
    pub use crate::tree::{NodeArena, NodeId, TreeEvent};
    pub use crate::type_descriptor::{FieldDescriptor, TypeDescriptor};
    pub use crate::view::{InspectorRequest, NodeRow, UserIntent};
}

// Core functionality
pub mod config;
pub mod error;

// Host contracts
pub mod host;
pub mod schema;

// Structure discovery
pub mod format;
pub mod type_descriptor;

// The inspection tree
pub mod builder;
pub mod inspector;
pub mod refresh;
pub mod tree;
pub mod view;

// Snapshots and queries
pub mod diff;
pub mod query;
pub mod snapshot;
