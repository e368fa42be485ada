//! Relation accessors.
//!
//! Each factory resolves a [`RelationDefinition`](loopback_schema::RelationDefinition)
//! once and is then invoked per request with a source id. Target
//! repositories are reached through [`Getter`](crate::Getter)s and resolved
//! on every call.

mod belongs_to;
mod constraint;
mod has_many;
mod has_one;
mod metadata;

pub use {belongs_to::*, constraint::*, has_many::*, has_one::*, metadata::*};
