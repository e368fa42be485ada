//! Repositories, datasources and relation accessors.
//!
//! A [`DefaultCrudRepository`] persists one model through a [`DataSource`].
//! Repositories that relate to each other are wired with [`RepositorySlot`]s
//! and [`Getter`]s, so cyclic graphs (Customer -> Order -> Customer) are
//! built in two phases:
//!
//! ```ignore
//! let customers = RepositorySlot::<dyn EntityCrudRepository<Customer>>::new("CustomerRepository");
//! let orders = RepositorySlot::<dyn EntityCrudRepository<Order>>::new("OrderRepository");
//!
//! let order_repo = Arc::new(DefaultCrudRepository::<Order>::new(db.clone()));
//! let customer_of = create_belongs_to_accessor(
//!     Order::definition().relation("customer").unwrap(),
//!     customers.getter(),
//!     order_repo.clone(),
//! )?;
//!
//! customers.fill(Arc::new(DefaultCrudRepository::<Customer>::new(db.clone())))?;
//! orders.fill(order_repo)?;
//!
//! let customer = customer_of.get(&order.id.into()).await?;
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

mod datasource;
mod error;
mod filter;
mod getter;
mod relations;
mod repository;

pub use {datasource::*, error::*, filter::*, getter::*, relations::*, repository::*};

/// A stored row.
pub type Document = Map<String, Value>;

/// Anything a repository can hand back: typed entities or raw [`Document`]s.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

pub mod prelude {
    pub use crate::{
        create_belongs_to_accessor, create_has_many_repository_factory,
        create_has_one_repository_factory, BelongsToAccessor, Count, DataSource,
        DefaultCrudRepository, DefaultHasManyRepository, DefaultHasOneRepository, Document,
        EntityCrudRepository, Filter, Getter, HasManyRepository, HasManyRepositoryFactory,
        HasOneRepository, HasOneRepositoryFactory, RepositoryError, RepositorySlot, Where,
    };
    pub use loopback_schema::{Entity, EntityId, ModelDefinition};
}
