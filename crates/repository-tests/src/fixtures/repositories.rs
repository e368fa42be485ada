use loopback_repository::prelude::*;
use std::ops::Deref;
use std::sync::Arc;

use super::{Address, Customer, Order, Shipment};

macro_rules! crud_deref {
    ($repository:ident, $entity:ty) => {
        impl Deref for $repository {
            type Target = DefaultCrudRepository<$entity>;

            fn deref(&self) -> &Self::Target {
                &self.crud
            }
        }

        impl $repository {
            /// The underlying CRUD repository, as handed out to related repositories.
            pub fn crud(&self) -> Arc<dyn EntityCrudRepository<$entity>> {
                self.crud.clone()
            }
        }
    };
}

pub struct CustomerRepository {
    crud: Arc<DefaultCrudRepository<Customer>>,
    pub orders: HasManyRepositoryFactory<Order>,
    pub address: HasOneRepositoryFactory<Address>,
    pub customers: HasManyRepositoryFactory<Customer>,
    pub parent: BelongsToAccessor<Customer, Customer>,
}

impl CustomerRepository {
    pub fn new(
        definition: Arc<ModelDefinition>,
        db: DataSource,
        customers: Getter<dyn EntityCrudRepository<Customer>>,
        orders: Getter<dyn EntityCrudRepository<Order>>,
        addresses: Getter<dyn EntityCrudRepository<Address>>,
    ) -> anyhow::Result<Self> {
        let crud = Arc::new(DefaultCrudRepository::with_definition(definition, db));
        Ok(Self {
            orders: crud.create_has_many_repository_factory_for("orders", orders)?,
            address: crud.create_has_one_repository_factory_for("address", addresses)?,
            customers: crud.create_has_many_repository_factory_for("customers", customers.clone())?,
            parent: crud.create_belongs_to_accessor_for("parent", customers)?,
            crud,
        })
    }
}

crud_deref!(CustomerRepository, Customer);

pub struct OrderRepository {
    crud: Arc<DefaultCrudRepository<Order>>,
    pub customer: BelongsToAccessor<Customer, Order>,
    pub shipment: BelongsToAccessor<Shipment, Order>,
}

impl OrderRepository {
    pub fn new(
        definition: Arc<ModelDefinition>,
        db: DataSource,
        customers: Getter<dyn EntityCrudRepository<Customer>>,
        shipments: Getter<dyn EntityCrudRepository<Shipment>>,
    ) -> anyhow::Result<Self> {
        let crud = Arc::new(DefaultCrudRepository::with_definition(definition, db));
        // Plain factory over the declared relations; key defaults are filled in there.
        let source: Arc<dyn EntityCrudRepository<Order>> = crud.clone();
        let relation = |name: &str| {
            crud.definition()
                .relation(name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Order has no relation `{}`", name))
        };
        Ok(Self {
            customer: create_belongs_to_accessor(
                &relation("customer")?,
                customers,
                source.clone(),
            )?,
            shipment: create_belongs_to_accessor(&relation("shipment")?, shipments, source)?,
            crud,
        })
    }
}

crud_deref!(OrderRepository, Order);

pub struct ShipmentRepository {
    crud: Arc<DefaultCrudRepository<Shipment>>,
    pub shipment_orders: HasManyRepositoryFactory<Order>,
}

impl ShipmentRepository {
    pub fn new(
        definition: Arc<ModelDefinition>,
        db: DataSource,
        orders: Getter<dyn EntityCrudRepository<Order>>,
    ) -> anyhow::Result<Self> {
        let crud = Arc::new(DefaultCrudRepository::with_definition(definition, db));
        Ok(Self {
            shipment_orders: crud.create_has_many_repository_factory_for("shipmentOrders", orders)?,
            crud,
        })
    }
}

crud_deref!(ShipmentRepository, Shipment);

pub struct AddressRepository {
    crud: Arc<DefaultCrudRepository<Address>>,
    pub customer: BelongsToAccessor<Customer, Address>,
}

impl AddressRepository {
    pub fn new(
        definition: Arc<ModelDefinition>,
        db: DataSource,
        customers: Getter<dyn EntityCrudRepository<Customer>>,
    ) -> anyhow::Result<Self> {
        let crud = Arc::new(DefaultCrudRepository::with_definition(definition, db));
        Ok(Self {
            customer: crud.create_belongs_to_accessor_for("customer", customers)?,
            crud,
        })
    }
}

crud_deref!(AddressRepository, Address);
