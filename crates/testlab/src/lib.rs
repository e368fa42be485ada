//! Helpers shared by LoopBack test suites.
//!
//! - [`given_http_server_config`]: server settings for an ephemeral local port,
//!   with dummy TLS material when `https` is requested.
//! - [`with_test_datasource`]: run a test against a fresh, uniquely named
//!   in-memory datasource.
//! - [`to_json`], [`contains_deep`] and [`pick`]: compare entities by their JSON form.
//!
//! # Example
//! ```ignore
//! use loopback_testlab::*;
//!
//! #[tokio::test]
//! async fn my_test() -> anyhow::Result<()> {
//!     with_test_datasource("orders", |db| async move {
//!         let repo = DefaultCrudRepository::<Order>::new(db);
//!         let order = repo.create(json!({"description": "pen"})).await?;
//!         assert!(contains_deep(&to_json(&order)?, &json!({"description": "pen"})));
//!         Ok(())
//!     })
//!     .await
//! }
//! ```

mod datasource;
mod http_server_config;
mod json;

pub use {datasource::*, http_server_config::*, json::*};
