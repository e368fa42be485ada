//! Plain repository usage on the `Product` fixture.

use loopback_repository::prelude::*;
use loopback_schema::{PropertyDefinition, PropertyType};
use loopback_testlab::{contains_deep, given_test_datasource, to_json};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::fixtures::{FixtureModels, Product};
use crate::{id_of, CrudFeatures};

fn given_product_repository(features: &CrudFeatures) -> DefaultCrudRepository<Product> {
    let models = FixtureModels::new(features);
    DefaultCrudRepository::with_definition(
        models.product.clone(),
        given_test_datasource("products"),
    )
}

pub async fn counts_models_in_empty_database(features: CrudFeatures) -> anyhow::Result<()> {
    let repo = given_product_repository(&features);
    assert_eq!(repo.count(None).await?, Count { count: 0 });
    Ok(())
}

pub async fn creates_a_new_model(features: CrudFeatures) -> anyhow::Result<()> {
    let repo = given_product_repository(&features);
    let product = repo.create(json!({"name": "Ink Pen", "slug": "pen"})).await?;
    let id = id_of(&product.id)?;
    match (&id, features.id_type) {
        (EntityId::String(_), PropertyType::String) => {}
        (EntityId::Number(_), PropertyType::Number) => {}
        other => anyhow::bail!("unexpected generated id {:?}", other),
    }
    assert!(repo.exists(&id).await?);
    Ok(())
}

pub async fn can_save_a_model(features: CrudFeatures) -> anyhow::Result<()> {
    let repo = given_product_repository(&features);
    let mut product = repo.create(json!({"slug": "pencil"})).await?;

    product.name = Some("Red Pencil".to_string());
    repo.save(&product).await?;

    let found = repo.find_by_id(&id_of(&product.id)?, None).await?;
    assert_eq!(found.slug.as_deref(), Some("pencil"));
    assert_eq!(found.name.as_deref(), Some("Red Pencil"));
    assert_eq!(repo.count(None).await?.count, 1);
    Ok(())
}

pub async fn save_creates_a_model_without_id(features: CrudFeatures) -> anyhow::Result<()> {
    let repo = given_product_repository(&features);
    let saved = repo
        .save(&Product {
            id: None,
            name: Some("Eraser".to_string()),
            slug: None,
        })
        .await?;
    assert!(saved.id.is_some());
    assert_eq!(repo.count(None).await?.count, 1);
    Ok(())
}

pub async fn rejects_extra_model_properties(features: CrudFeatures) -> anyhow::Result<()> {
    let repo = given_product_repository(&features);
    let err = repo
        .create(json!({"name": "custom", "extra": "additional-data"}))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("extra property was accepted"))?;
    let message = err.to_string();
    assert!(message.contains("extra") && message.contains("not defined"), "{}", message);
    Ok(())
}

pub async fn allows_models_to_allow_additional_properties(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    if !features.free_form_properties {
        return Ok(());
    }
    let flexible = ModelDefinition::new("Flexible")
        .add_property(PropertyDefinition::id("id", features.id_type))
        .strict(false)
        .build();
    let repo = DefaultCrudRepository::<Document>::with_definition(
        flexible,
        given_test_datasource("flexible"),
    );

    let created = repo.create(json!({"extra": "additional data"})).await?;
    let id = created
        .get("id")
        .and_then(EntityId::from_value)
        .ok_or_else(|| anyhow::anyhow!("flexible row has no id"))?;
    let stored = repo.find_by_id(&id, None).await?;
    assert!(contains_deep(&to_json(&stored)?, &json!({"extra": "additional data"})));
    Ok(())
}

pub async fn finds_one_model_with_a_filter(features: CrudFeatures) -> anyhow::Result<()> {
    let repo = given_product_repository(&features);
    repo.create_all(vec![
        json!({"name": "Ink Pen", "slug": "pen"}),
        json!({"name": "Pencil", "slug": "pencil"}),
    ])
    .await?;

    let filter = Filter::new().where_(Where::eq("slug", "pencil"));
    let found = repo.find_one(Some(filter)).await?;
    assert_eq!(found.and_then(|p| p.name).as_deref(), Some("Pencil"));

    let none = repo
        .find_one(Some(Filter::new().where_(Where::eq("slug", "brush"))))
        .await?;
    assert_eq!(none, None);
    Ok(())
}
