//! Schema descriptors for LoopBack models.
//!
//! Models are declared once at startup as immutable [`ModelDefinition`]s:
//! an ordered list of properties, the relations to other models and a few
//! settings. Relation targets are resolved lazily through a [`TypeResolver`]
//! so that models can reference each other cyclically.
//!
//! # Example
//! ```ignore
//! use loopback_schema::*;
//!
//! impl Entity for Order {
//!     fn definition() -> Arc<ModelDefinition> {
//!         static DEFINITION: OnceLock<Arc<ModelDefinition>> = OnceLock::new();
//!         DEFINITION
//!             .get_or_init(|| {
//!                 ModelDefinition::new("Order")
//!                     .add_property(PropertyDefinition::id("id", PropertyType::Number))
//!                     .add_property(
//!                         PropertyDefinition::new("description", PropertyType::String).required(),
//!                     )
//!                     .belongs_to("customerId", TypeResolver::of::<Customer>())
//!                     .build()
//!             })
//!             .clone()
//!     }
//! }
//! ```

mod error;
mod id;
mod json;
mod model;
mod property;
mod relation;

pub use {error::*, id::*, json::*, model::*, property::*, relation::*};
