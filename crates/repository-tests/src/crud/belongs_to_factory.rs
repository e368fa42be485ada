//! `create_belongs_to_accessor` used directly on plain repositories.

use loopback_repository::prelude::*;
use loopback_schema::{PropertyDefinition, PropertyType, RelationDefinition, TypeResolver};
use loopback_testlab::given_test_datasource;
use serde_json::json;
use std::sync::Arc;

use crate::CrudFeatures;

struct Repositories {
    customers: Arc<DefaultCrudRepository<Document>>,
    orders: Arc<DefaultCrudRepository<Document>>,
    customer_of_order: BelongsToAccessor<Document, Document>,
}

fn given_accessor(features: &CrudFeatures) -> anyhow::Result<Repositories> {
    let customer = ModelDefinition::new("Customer")
        .add_property(PropertyDefinition::id("id", features.id_type))
        .add_property(PropertyDefinition::new("name", PropertyType::String).required())
        .build();
    let order = ModelDefinition::new("Order")
        .add_property(PropertyDefinition::id("id", features.id_type))
        .add_property(PropertyDefinition::new("description", PropertyType::String).required())
        .add_property(PropertyDefinition::new("customerId", features.id_type).required())
        .add_relation(
            RelationDefinition::belongs_to(
                "customer",
                TypeResolver::from_definition(customer.clone()),
            )
            .key_from("customerId")
            .key_to("id"),
        )
        .build();

    let db = given_test_datasource("belongs_to_factory");
    let customers = Arc::new(DefaultCrudRepository::<Document>::with_definition(
        customer,
        db.clone(),
    ));
    let orders = Arc::new(DefaultCrudRepository::<Document>::with_definition(order.clone(), db));

    let relation = order
        .relation("customer")
        .ok_or_else(|| anyhow::anyhow!("Order has no customer relation"))?;
    let target: Arc<dyn EntityCrudRepository<Document>> = customers.clone();
    let source: Arc<dyn EntityCrudRepository<Document>> = orders.clone();
    let customer_of_order =
        create_belongs_to_accessor(relation, Getter::from_value(target), source)?;

    Ok(Repositories {
        customers,
        orders,
        customer_of_order,
    })
}

fn id_of(row: &Document) -> anyhow::Result<EntityId> {
    row.get("id")
        .and_then(EntityId::from_value)
        .ok_or_else(|| anyhow::anyhow!("row has no id"))
}

pub async fn finds_an_instance_of_the_related_model(features: CrudFeatures) -> anyhow::Result<()> {
    let repos = given_accessor(&features)?;
    let customer = repos.customers.create(json!({"name": "Order McForder"})).await?;
    let order = repos
        .orders
        .create(json!({
            "customerId": customer["id"],
            "description": "Order from Order McForder, the hoarder of Mordor"
        }))
        .await?;

    let result = repos.customer_of_order.get(&id_of(&order)?).await?;
    assert_eq!(result, customer);
    Ok(())
}

pub async fn throws_not_found_when_the_related_model_does_not_exist(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let repos = given_accessor(&features)?;
    let order = repos
        .orders
        .create(json!({
            "customerId": features.missing_id(),
            "description": "Order of a fictional customer"
        }))
        .await?;

    let result = repos.customer_of_order.get(&id_of(&order)?).await;
    assert!(matches!(result, Err(ref err) if err.is_not_found()));
    Ok(())
}
