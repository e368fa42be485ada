//! CRUD REST APIs synthesized from model configuration.
//!
//! Given a bound model and datasource, a `public-models/<name>.config.json`
//! file such as
//!
//! ```json
//! {"model": "Product", "pattern": "CrudRest", "dataSource": "db", "basePath": "/products"}
//! ```
//!
//! produces a `ProductRepository` and a `ProductController` serving the CRUD
//! routes under `/products`.
//!
//! ```ignore
//! let app = Application::new();
//! let report = boot_project(&app, "./my-project").await?;
//! for failure in &report.failures {
//!     eprintln!("{}", failure);
//! }
//! let response = app.handle(RestRequest::get("/products/count")).await;
//! ```

mod application;
mod booter;
mod controller;
mod error;
mod model_api;
mod request;

pub use {
    application::*, booter::*, controller::*, error::*, model_api::*, request::*,
};
