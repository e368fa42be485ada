//! belongsTo accessors `order.customer` and `order.shipment`.

use loopback_repository::prelude::*;
use loopback_testlab::given_test_datasource;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{given_bound_crud_repositories, id_of, BoundRepositories, CrudFeatures};

fn given_repositories(features: &CrudFeatures) -> anyhow::Result<BoundRepositories> {
    given_bound_crud_repositories(given_test_datasource("belongs_to"), features)
}

pub async fn can_find_customer_of_order(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer = bound.customer_repo.create(json!({"name": "Order McForder"})).await?;
    let order = bound
        .order_repo
        .create(json!({
            "customerId": customer.id,
            "description": "Order from Order McForder, the hoarder of Mordor"
        }))
        .await?;

    let result = bound.order_repo.customer.get(&id_of(&order.id)?).await?;
    assert_eq!(result, customer);
    Ok(())
}

pub async fn can_find_shipment_of_order_with_a_custom_foreign_key_name(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let shipment = bound
        .shipment_repo
        .create(json!({"name": "Tuesday morning shipment"}))
        .await?;
    let order = bound
        .order_repo
        .create(json!({
            "shipment_id": shipment.id,
            "description": "Order that is shipped Tuesday morning"
        }))
        .await?;

    let result = bound.order_repo.shipment.get(&id_of(&order.id)?).await?;
    assert_eq!(result, shipment);

    // The inverse hasMany uses the same custom key.
    let shipped = bound
        .shipment_repo
        .shipment_orders
        .of(id_of(&shipment.id)?)
        .find(None)
        .await?;
    assert_eq!(shipped, vec![order]);
    Ok(())
}

pub async fn reports_related_not_found_for_a_dangling_foreign_key(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let order = bound
        .order_repo
        .create(json!({
            "customerId": features.missing_id(),
            "description": "Order of a fictional customer"
        }))
        .await?;

    let result = bound.order_repo.customer.get(&id_of(&order.id)?).await;
    assert!(matches!(
        result,
        Err(RepositoryError::RelatedEntityNotFound { ref entity_name, .. })
            if entity_name == "Customer"
    ));
    Ok(())
}

pub async fn reports_related_not_found_without_a_foreign_key(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let order = bound
        .order_repo
        .create(json!({"description": "Order without a customer"}))
        .await?;

    let result = bound.order_repo.customer.get(&id_of(&order.id)?).await;
    assert!(matches!(result, Err(RepositoryError::RelatedEntityNotFound { .. })));
    Ok(())
}

pub async fn reports_entity_not_found_for_a_missing_source(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let result = bound.order_repo.customer.get(&features.missing_id()).await;
    assert!(matches!(
        result,
        Err(RepositoryError::EntityNotFound { ref entity_name, .. }) if entity_name == "Order"
    ));
    Ok(())
}

pub async fn resolves_the_address_owner(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer = bound.customer_repo.create(json!({"name": "Alice"})).await?;
    let address = bound
        .customer_repo
        .address
        .of(id_of(&customer.id)?)
        .create(json!({"city": "London"}))
        .await?;

    let owner = bound.address_repo.customer.get(&id_of(&address.id)?).await?;
    assert_eq!(owner.name.as_deref(), Some("Alice"));
    Ok(())
}
