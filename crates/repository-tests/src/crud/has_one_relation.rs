//! hasOne accessor `customer.address`.

use loopback_repository::prelude::*;
use loopback_repository::Fields;
use loopback_testlab::{contains_deep, given_test_datasource, to_json};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::fixtures::Address;
use crate::{given_bound_crud_repositories, id_of, BoundRepositories, CrudFeatures};

fn given_repositories(features: &CrudFeatures) -> anyhow::Result<BoundRepositories> {
    given_bound_crud_repositories(given_test_datasource("has_one"), features)
}

async fn given_persisted_customer(
    bound: &BoundRepositories,
    name: &str,
) -> anyhow::Result<EntityId> {
    let customer = bound.customer_repo.create(json!({"name": name})).await?;
    id_of(&customer.id)
}

async fn create_customer_address(
    bound: &BoundRepositories,
    customer_id: &EntityId,
    data: Value,
) -> anyhow::Result<Address> {
    Ok(bound.customer_repo.address.of(customer_id.clone()).create(data).await?)
}

pub async fn can_create_an_instance_of_the_related_model(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;

    let address =
        create_customer_address(&bound, &customer_id, json!({"street": "123 test avenue"}))
            .await?;
    assert!(contains_deep(
        &to_json(&address)?,
        &json!({"customerId": customer_id, "street": "123 test avenue"})
    ));
    assert_eq!(address.customer_id.as_ref(), Some(&customer_id));

    let persisted = bound.address_repo.find_by_id(&id_of(&address.id)?, None).await?;
    assert_eq!(persisted, address);
    Ok(())
}

pub async fn refuses_to_create_related_model_instance_twice(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    let address =
        create_customer_address(&bound, &customer_id, json!({"street": "123 test avenue"}))
            .await?;

    let second = bound
        .customer_repo
        .address
        .of(customer_id.clone())
        .create(json!({"street": "456 test street"}))
        .await;
    assert!(matches!(
        second,
        Err(RepositoryError::DuplicateRelatedEntity { ref property, .. })
            if property == "customerId"
    ));

    let persisted = bound.address_repo.find_by_id(&id_of(&address.id)?, None).await?;
    assert_eq!(persisted.street.as_deref(), Some("123 test avenue"));
    assert_eq!(bound.address_repo.count(None).await?.count, 1);
    Ok(())
}

pub async fn can_find_instance_of_the_related_model(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    let address =
        create_customer_address(&bound, &customer_id, json!({"street": "123 test avenue"}))
            .await?;

    let found = bound.customer_repo.address.of(customer_id.clone()).get(None).await?;
    assert_eq!(found, address);

    let persisted = bound
        .address_repo
        .find(Some(Filter::new().where_(Where::eq("customerId", customer_id.to_value()))))
        .await?;
    assert_eq!(persisted.first(), Some(&found));
    Ok(())
}

pub async fn get_keeps_the_caller_fields(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    create_customer_address(
        &bound,
        &customer_id,
        json!({"street": "1 Main St", "city": "Lyon"}),
    )
    .await?;

    let found = bound
        .customer_repo
        .address
        .of(customer_id)
        .get(Some(Filter::new().fields(Fields::only(["id", "city"]))))
        .await?;
    assert_eq!(found.city.as_deref(), Some("Lyon"));
    assert_eq!(found.street, None);
    Ok(())
}

pub async fn get_ignores_the_caller_where(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    let address =
        create_customer_address(&bound, &customer_id, json!({"street": "123 test avenue"}))
            .await?;

    let found = bound
        .customer_repo
        .address
        .of(customer_id)
        .get(Some(Filter::new().where_(Where::eq("street", "456 test road"))))
        .await?;
    assert_eq!(to_json(&found)?, to_json(&address)?);
    Ok(())
}

pub async fn reports_not_found_when_related_model_is_deleted(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    let address =
        create_customer_address(&bound, &customer_id, json!({"street": "123 test avenue"}))
            .await?;
    bound.address_repo.delete_by_id(&id_of(&address.id)?).await?;

    let err = bound
        .customer_repo
        .address
        .of(customer_id)
        .get(None)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("deleted address was still found"))?;
    assert!(err.is_not_found(), "{}", err);
    Ok(())
}

pub async fn can_patch_has_one_instances(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    let address = create_customer_address(
        &bound,
        &customer_id,
        json!({
            "street": "1 Amedee Bonnet",
            "zipcode": "69740",
            "city": "Genas",
            "province": "Rhone"
        }),
    )
    .await?;

    let patched = bound
        .customer_repo
        .address
        .of(customer_id.clone())
        .patch(json!({"city": "Lyon-Genas"}))
        .await?;
    assert_eq!(patched, Count { count: 1 });

    let patched_data = bound.address_repo.find_by_id(&id_of(&address.id)?, None).await?;
    assert_eq!(
        to_json(&patched_data)?,
        json!({
            "id": address.id,
            "customerId": customer_id,
            "street": "1 Amedee Bonnet",
            "zipcode": "69740",
            "city": "Lyon-Genas",
            "province": "Rhone"
        })
    );
    Ok(())
}

pub async fn patches_the_related_instance_only(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let bob = given_persisted_customer(&bound, "Bob").await?;
    create_customer_address(&bound, &bob, json!({"city": "Paris"})).await?;
    let alice = given_persisted_customer(&bound, "Alice").await?;
    create_customer_address(&bound, &alice, json!({"city": "London"})).await?;

    let result = bound
        .customer_repo
        .address
        .of(alice.clone())
        .patch(json!({"city": "New York"}))
        .await?;
    assert_eq!(result, Count { count: 1 });

    let bobs = bound.customer_repo.address.of(bob).get(None).await?;
    assert!(contains_deep(&to_json(&bobs)?, &json!({"city": "Paris"})));
    let alices = bound.customer_repo.address.of(alice).get(None).await?;
    assert_eq!(alices.city.as_deref(), Some("New York"));
    Ok(())
}

pub async fn throws_an_error_when_patch_tries_to_change_the_foreign_key(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    create_customer_address(&bound, &customer_id, json!({"city": "Paris"})).await?;

    let err = bound
        .customer_repo
        .address
        .of(customer_id.clone())
        .patch(json!({"customerId": features.other_id(&customer_id)}))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("foreign key change was accepted"))?;
    assert_eq!(err.to_string(), "Property \"customerId\" cannot be changed!");
    Ok(())
}

pub async fn can_delete_has_one_relation_instances(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let customer_id = given_persisted_customer(&bound, "a customer").await?;
    create_customer_address(
        &bound,
        &customer_id,
        json!({
            "street": "1 Amedee Bonnet",
            "zipcode": "69740",
            "city": "Genas",
            "province": "Rhone"
        }),
    )
    .await?;

    let address = bound.customer_repo.address.of(customer_id);
    assert_eq!(address.delete().await?, Count { count: 1 });
    let found = address.get(None).await;
    assert!(matches!(found, Err(ref err) if err.is_not_found()));
    Ok(())
}

pub async fn deletes_the_related_model_instance_only(features: CrudFeatures) -> anyhow::Result<()> {
    let bound = given_repositories(&features)?;
    let bob = given_persisted_customer(&bound, "Bob").await?;
    create_customer_address(&bound, &bob, json!({"city": "Paris"})).await?;
    let alice = given_persisted_customer(&bound, "Alice").await?;
    create_customer_address(&bound, &alice, json!({"city": "London"})).await?;

    let result = bound.customer_repo.address.of(alice).delete().await?;
    assert_eq!(result, Count { count: 1 });

    let found = bound.address_repo.find(None).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].city.as_deref(), Some("Paris"));
    Ok(())
}
