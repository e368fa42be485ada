//! hasMany accessors on the fixture repositories (`customer.orders`,
//! `customer.customers`, `customer.parent`).

use loopback_repository::prelude::*;
use loopback_testlab::{given_test_datasource, pick, to_json};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::fixtures::Order;
use crate::{given_bound_crud_repositories, id_of, BoundRepositories, CrudFeatures};

fn given_repositories(features: &CrudFeatures) -> anyhow::Result<BoundRepositories> {
    given_bound_crud_repositories(given_test_datasource("has_many"), features)
}

async fn given_persisted_customer(bound: &BoundRepositories) -> anyhow::Result<EntityId> {
    let customer = bound.customer_repo.create(json!({"name": "a customer"})).await?;
    id_of(&customer.id)
}

async fn create_customer_order(
    bound: &BoundRepositories,
    customer_id: &EntityId,
    data: serde_json::Value,
) -> anyhow::Result<Order> {
    Ok(bound.customer_repo.orders.of(customer_id.clone()).create(data).await?)
}

pub async fn can_create_an_instance_of_the_related_model(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;

    let order =
        create_customer_order(&bound, &customer_id, json!({"description": "order 1"}))
            .await?;
    assert_eq!(order.customer_id.as_ref(), Some(&customer_id));
    assert_eq!(order.description, "order 1");

    let persisted = bound.order_repo.find_by_id(&id_of(&order.id)?, None).await?;
    assert_eq!(to_json(&persisted)?, to_json(&order)?);
    Ok(())
}

pub async fn can_find_instances_of_the_related_model(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    let other_id = features.other_id(&customer_id);

    let order =
        create_customer_order(&bound, &customer_id, json!({"description": "order 1"}))
            .await?;
    let not_my_order =
        create_customer_order(&bound, &other_id, json!({"description": "order 2"}))
            .await?;

    let found = bound.customer_repo.orders.of(customer_id.clone()).find(None).await?;
    assert!(found.contains(&order));
    assert!(!found.contains(&not_my_order));

    let persisted = bound
        .order_repo
        .find(Some(Filter::new().where_(Where::eq("customerId", customer_id.to_value()))))
        .await?;
    assert_eq!(persisted, found);
    Ok(())
}

pub async fn find_keeps_the_caller_filter(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    let other_id = features.other_id(&customer_id);
    for (owner, description, shipped) in [
        (&customer_id, "a", false),
        (&other_id, "b", true),
        (&customer_id, "c", true),
        (&customer_id, "d", true),
    ] {
        create_customer_order(
            &bound,
            owner,
            json!({"description": description, "isShipped": shipped}),
        )
        .await?;
    }

    let filter = Filter::new()
        .where_(Where::eq("isShipped", true))
        .order("description DESC");
    let found = bound
        .customer_repo
        .orders
        .of(customer_id.clone())
        .find(Some(filter))
        .await?;
    let descriptions: Vec<_> = found.iter().map(|o| o.description.as_str()).collect();
    assert_eq!(descriptions, vec!["d", "c"]);
    Ok(())
}

pub async fn can_patch_many_instances(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    let other_id = features.other_id(&customer_id);
    create_customer_order(
        &bound,
        &customer_id,
        json!({"description": "order 1", "isShipped": false}),
    )
    .await?;
    create_customer_order(
        &bound,
        &customer_id,
        json!({"description": "order 2", "isShipped": false}),
    )
    .await?;
    create_customer_order(
        &bound,
        &other_id,
        json!({"description": "order 3", "isShipped": false}),
    )
    .await?;

    let orders = bound.customer_repo.orders.of(customer_id.clone());
    let patched = orders.patch(json!({"isShipped": true}), None).await?;
    assert_eq!(patched, Count { count: 2 });

    let mut patched_data = Vec::new();
    for order in orders.find(None).await? {
        patched_data.push(pick(&to_json(&order)?, &["customerId", "description", "isShipped"]));
    }
    assert_eq!(
        patched_data,
        vec![
            json!({"customerId": customer_id, "description": "order 1", "isShipped": true}),
            json!({"customerId": customer_id, "description": "order 2", "isShipped": true}),
        ]
    );

    let untouched = bound
        .customer_repo
        .orders
        .of(other_id)
        .find(None)
        .await?;
    assert!(untouched.iter().all(|o| !o.is_shipped));
    Ok(())
}

pub async fn patch_with_where_narrows_the_scope(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    create_customer_order(&bound, &customer_id, json!({"description": "order 1"})).await?;
    create_customer_order(&bound, &customer_id, json!({"description": "order 2"})).await?;

    let orders = bound.customer_repo.orders.of(customer_id);
    let patched = orders
        .patch(json!({"isShipped": true}), Some(Where::eq("description", "order 2")))
        .await?;
    assert_eq!(patched.count, 1);
    let shipped: Vec<_> = orders
        .find(None)
        .await?
        .into_iter()
        .filter(|o| o.is_shipped)
        .map(|o| o.description)
        .collect();
    assert_eq!(shipped, vec!["order 2".to_string()]);
    Ok(())
}

pub async fn rejects_patch_of_the_foreign_key(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    create_customer_order(&bound, &customer_id, json!({"description": "order 1"})).await?;
    let orders = bound.customer_repo.orders.of(customer_id.clone());

    let changed = orders
        .patch(json!({"customerId": features.other_id(&customer_id)}), None)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("patch changing the foreign key succeeded"))?;
    assert_eq!(changed.to_string(), "Property \"customerId\" cannot be changed!");

    // Even the current value is refused.
    let same = orders.patch(json!({"customerId": customer_id}), None).await;
    assert!(matches!(
        same,
        Err(RepositoryError::ForeignKeyMismatch { ref property }) if property == "customerId"
    ));
    Ok(())
}

pub async fn create_rejects_a_conflicting_foreign_key(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    let orders = bound.customer_repo.orders.of(customer_id.clone());

    let repeated = orders
        .create(json!({"description": "same key", "customerId": customer_id}))
        .await?;
    assert_eq!(repeated.customer_id.as_ref(), Some(&customer_id));

    let conflicting = orders
        .create(json!({"description": "other key", "customerId": features.other_id(&customer_id)}))
        .await;
    assert!(matches!(conflicting, Err(RepositoryError::ForeignKeyMismatch { .. })));
    assert_eq!(bound.order_repo.count(None).await?.count, 1);
    Ok(())
}

pub async fn can_delete_many_instances(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    create_customer_order(&bound, &customer_id, json!({"description": "order 1"})).await?;
    create_customer_order(&bound, &customer_id, json!({"description": "order 2"})).await?;

    let orders = bound.customer_repo.orders.of(customer_id);
    assert_eq!(orders.delete(None).await?.count, 2);
    assert!(orders.find(None).await?.is_empty());
    Ok(())
}

pub async fn does_not_delete_instances_of_other_sources(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound).await?;
    let other_id = features.other_id(&customer_id);
    let new_order = json!({"customerId": other_id, "description": "another order"});
    bound.order_repo.create(new_order.clone()).await?;
    create_customer_order(&bound, &customer_id, json!({"description": "mine"})).await?;

    let deleted = bound.customer_repo.orders.of(customer_id).delete(None).await?;
    assert_eq!(deleted.count, 1);

    let orders = bound.order_repo.find(None).await?;
    assert_eq!(orders.len(), 1);
    assert_eq!(pick(&to_json(&orders[0])?, &["customerId", "description"]), new_order);
    Ok(())
}

pub async fn does_not_create_an_array_of_the_related_model(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let err = bound
        .customer_repo
        .create(json!({"name": "a customer", "orders": [{"description": "order 1"}]}))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("navigational property was accepted"))?;
    assert!(err.to_string().contains("`orders` is not defined"), "{}", err);
    Ok(())
}

pub async fn gets_the_parent_entity_through_the_child_entity(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let parent = bound.customer_repo.create(json!({"name": "parent customer"})).await?;
    let child = bound
        .customer_repo
        .create(json!({"name": "child customer", "parentId": parent.id}))
        .await?;

    let childs_parent = bound.customer_repo.parent.get(&id_of(&child.id)?).await?;
    assert_eq!(
        pick(&to_json(&childs_parent)?, &["id", "name"]),
        pick(&to_json(&parent)?, &["id", "name"])
    );
    Ok(())
}

pub async fn creates_a_child_entity_through_the_parent_entity(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let parent = bound.customer_repo.create(json!({"name": "parent customer"})).await?;
    let parent_id = id_of(&parent.id)?;

    let children = bound.customer_repo.customers.of(parent_id.clone());
    let child = children.create(json!({"name": "child customer"})).await?;
    assert_eq!(child.parent_id.as_ref(), Some(&parent_id));
    assert!(children.find(None).await?.contains(&child));
    Ok(())
}
