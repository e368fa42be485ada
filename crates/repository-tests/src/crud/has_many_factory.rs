//! `create_has_many_repository_factory` used directly on plain repositories,
//! including two hasMany relations to the same target with different keys.

use loopback_repository::prelude::*;
use loopback_schema::{PropertyDefinition, PropertyType, RelationDefinition, TypeResolver};
use loopback_testlab::{given_test_datasource, to_json};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use crate::CrudFeatures;

struct Repositories {
    orders: Arc<DefaultCrudRepository<Document>>,
    reviews: Arc<DefaultCrudRepository<Document>>,
    existing_customer_id: EntityId,
    customer_orders: HasManyRepositoryFactory<Document>,
    authored_reviews: HasManyRepositoryFactory<Document>,
    approved_reviews: HasManyRepositoryFactory<Document>,
}

fn as_dyn(
    repo: &Arc<DefaultCrudRepository<Document>>,
) -> Getter<dyn EntityCrudRepository<Document>> {
    let repo: Arc<dyn EntityCrudRepository<Document>> = repo.clone();
    Getter::from_value(repo)
}

async fn given_factories(features: &CrudFeatures) -> anyhow::Result<Repositories> {
    let id_type = features.id_type;
    let order = ModelDefinition::new("Order")
        .add_property(PropertyDefinition::id("id", id_type))
        .add_property(PropertyDefinition::new("description", PropertyType::String).required())
        .add_property(PropertyDefinition::new("customerId", id_type))
        .build();
    let review = ModelDefinition::new("Review")
        .add_property(PropertyDefinition::id("id", id_type))
        .add_property(PropertyDefinition::new("description", PropertyType::String).required())
        .add_property(PropertyDefinition::new("authorId", id_type))
        .add_property(PropertyDefinition::new("approvedId", id_type))
        .build();
    let customer = ModelDefinition::new("Customer")
        .add_property(PropertyDefinition::id("id", id_type))
        .add_property(PropertyDefinition::new("name", PropertyType::String).required())
        .has_many("orders", TypeResolver::from_definition(order.clone()))
        .add_relation(
            RelationDefinition::has_many(
                "reviewsAuthored",
                TypeResolver::from_definition(review.clone()),
            )
            .key_to("authorId"),
        )
        .add_relation(
            RelationDefinition::has_many(
                "reviewsApproved",
                TypeResolver::from_definition(review.clone()),
            )
            .key_to("approvedId"),
        )
        .build();

    let db = given_test_datasource("has_many_factory");
    let customers =
        DefaultCrudRepository::<Document>::with_definition(customer.clone(), db.clone());
    let orders = Arc::new(DefaultCrudRepository::with_definition(order, db.clone()));
    let reviews = Arc::new(DefaultCrudRepository::with_definition(review, db));

    let created = customers.create(json!({"name": "a customer"})).await?;
    let existing_customer_id = created
        .get("id")
        .and_then(EntityId::from_value)
        .ok_or_else(|| anyhow::anyhow!("customer has no id"))?;

    let relation = |name: &str| {
        customer
            .relation(name)
            .ok_or_else(|| anyhow::anyhow!("Customer has no relation `{}`", name))
    };
    Ok(Repositories {
        customer_orders: create_has_many_repository_factory(relation("orders")?, as_dyn(&orders))?,
        authored_reviews: create_has_many_repository_factory(
            relation("reviewsAuthored")?,
            as_dyn(&reviews),
        )?,
        approved_reviews: create_has_many_repository_factory(
            relation("reviewsApproved")?,
            as_dyn(&reviews),
        )?,
        orders,
        reviews,
        existing_customer_id,
    })
}

pub async fn can_create_an_instance_of_the_related_model(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let repos = given_factories(&features).await?;
    let customer_id = repos.existing_customer_id.clone();
    let order = repos
        .customer_orders
        .of(customer_id.clone())
        .create(json!({"description": "an order desc", "customerId": customer_id}))
        .await?;

    let order_id = order
        .get("id")
        .and_then(EntityId::from_value)
        .ok_or_else(|| anyhow::anyhow!("order has no id"))?;
    let persisted = repos.orders.find_by_id(&order_id, None).await?;
    assert_eq!(to_json(&order)?, to_json(&persisted)?);
    Ok(())
}

pub async fn can_find_an_instance_of_the_related_model(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let repos = given_factories(&features).await?;
    let customer_id = repos.existing_customer_id.clone();
    let customer_orders = repos.customer_orders.of(customer_id.clone());
    let order = customer_orders
        .create(json!({"description": "an order desc", "customerId": customer_id}))
        .await?;
    let not_my_order = repos
        .orders
        .create(json!({
            "description": "someone else's order desc",
            "customerId": features.other_id(&customer_id)
        }))
        .await?;

    let persisted = repos
        .orders
        .find(Some(Filter::new().where_(Where::eq("customerId", customer_id.to_value()))))
        .await?;
    let orders = customer_orders.find(None).await?;
    assert_eq!(orders, persisted);
    assert!(orders.contains(&order));
    assert!(!orders.contains(&not_my_order));
    Ok(())
}

pub async fn finds_appropriate_related_model_instances_for_multiple_relations(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let repos = given_factories(&features).await?;
    let customer_one = repos.existing_customer_id.clone();
    let customer_two = features.other_id(&customer_one);

    repos
        .authored_reviews
        .of(customer_one.clone())
        .create(json!({"description": "my wonderful review", "approvedId": customer_two}))
        .await?;
    repos
        .authored_reviews
        .of(customer_two.clone())
        .create(json!({
            "description": "smash that progenitor loving approve button",
            "approvedId": customer_one
        }))
        .await?;

    for customer_id in [&customer_one, &customer_two] {
        let approved = repos.approved_reviews.of(customer_id.clone()).find(None).await?;
        let persisted = repos
            .reviews
            .find(Some(Filter::new().where_(Where::eq("approvedId", customer_id.to_value()))))
            .await?;
        assert_eq!(approved, persisted);
        assert_eq!(approved.len(), 1);
    }
    Ok(())
}
