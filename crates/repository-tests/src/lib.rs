//! Acceptance suites shared by every connector.
//!
//! Each suite is a module of `async fn(CrudFeatures) -> anyhow::Result<()>`
//! cases. A connector crate runs them from its own tests, once per id type
//! it supports:
//!
//! ```ignore
//! #[tokio::test]
//! async fn has_many_create() -> anyhow::Result<()> {
//!     loopback_repository_tests::has_many_relation::can_create_an_instance_of_the_related_model(
//!         CrudFeatures::number(),
//!     )
//!     .await
//! }
//! ```

mod crud;
mod features;
pub mod fixtures;
mod helpers;

pub use crud::*;
pub use {features::*, helpers::*};
