use loopback_repository::prelude::*;
use std::sync::Arc;

use crate::fixtures::{
    Address, AddressRepository, Customer, CustomerRepository, FixtureModels, Order,
    OrderRepository, Shipment, ShipmentRepository,
};
use crate::CrudFeatures;

/// The fixture repositories, wired to each other and sharing one datasource.
pub struct BoundRepositories {
    pub models: FixtureModels,
    pub customer_repo: Arc<CustomerRepository>,
    pub order_repo: Arc<OrderRepository>,
    pub shipment_repo: Arc<ShipmentRepository>,
    pub address_repo: Arc<AddressRepository>,
}

/// Build the Customer/Order/Shipment/Address repositories on `db`.
///
/// Slots are created first and handed out as getters, then filled once every
/// repository exists.
pub fn given_bound_crud_repositories(
    db: DataSource,
    features: &CrudFeatures,
) -> anyhow::Result<BoundRepositories> {
    let models = FixtureModels::new(features);

    let customers = RepositorySlot::<dyn EntityCrudRepository<Customer>>::new("CustomerRepository");
    let orders = RepositorySlot::<dyn EntityCrudRepository<Order>>::new("OrderRepository");
    let shipments = RepositorySlot::<dyn EntityCrudRepository<Shipment>>::new("ShipmentRepository");
    let addresses = RepositorySlot::<dyn EntityCrudRepository<Address>>::new("AddressRepository");

    let customer_repo = Arc::new(CustomerRepository::new(
        models.customer()?,
        db.clone(),
        customers.getter(),
        orders.getter(),
        addresses.getter(),
    )?);
    let order_repo = Arc::new(OrderRepository::new(
        models.order()?,
        db.clone(),
        customers.getter(),
        shipments.getter(),
    )?);
    let shipment_repo = Arc::new(ShipmentRepository::new(
        models.shipment()?,
        db.clone(),
        orders.getter(),
    )?);
    let address_repo = Arc::new(AddressRepository::new(
        models.address()?,
        db,
        customers.getter(),
    )?);

    customers.fill(customer_repo.crud())?;
    orders.fill(order_repo.crud())?;
    shipments.fill(shipment_repo.crud())?;
    addresses.fill(address_repo.crud())?;

    Ok(BoundRepositories {
        models,
        customer_repo,
        order_repo,
        shipment_repo,
        address_repo,
    })
}

/// The id of a stored entity, which every fixture row has.
pub fn id_of(id: &Option<EntityId>) -> anyhow::Result<EntityId> {
    id.clone()
        .ok_or_else(|| anyhow::anyhow!("entity has no id"))
}
