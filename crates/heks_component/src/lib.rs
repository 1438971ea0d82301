//! # heks_component
//!
//! The entity/component half of the heks engine.
//!
//! Components are not Rust types: they are dynamically typed
//! [`serde_json::Value`]s keyed by component name, so game code can attach any
//! primitive or object tree to an entity at runtime.
//!
//! This crate provides:
//!
//! - [`EntityId`] / [`EntityRegistry`]: string identities and their liveness.
//! - [`ComponentStore`]: `component name → entity → value`, pruned on removal.
//! - [`ComponentFilter`]: declarative conjunctive queries over the store.
//! - [`World`]: registry + store, enforcing that only live entities carry
//!   components.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod store;
pub mod world;

pub use component::{Components, Truthy, components_from_json, values_equal};
pub use entity::{EntityId, EntityRegistry};
pub use error::ComponentError;
pub use query::{ComponentFilter, FilterValue, filter_ids};
pub use store::ComponentStore;
pub use world::{EntityMut, EntityRef, World};
