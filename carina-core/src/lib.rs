//! Carina Core
//!
//! Core library for declarative infrastructure providers: the resource model,
//! attribute schemas, change detection, the `Provider` trait and the state
//! waiter used by long running operations.

pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
