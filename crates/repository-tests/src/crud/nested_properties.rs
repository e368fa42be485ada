//! Object and array-of-object properties survive a round trip.

use loopback_repository::prelude::*;
use loopback_schema::{PropertyDefinition, PropertyType};
use loopback_testlab::{contains_deep, given_test_datasource, to_json};
use serde_json::json;

use crate::CrudFeatures;

pub async fn allows_models_to_have_nested_model_properties(
    features: CrudFeatures,
) -> anyhow::Result<()> {
    let user = ModelDefinition::new("User")
        .add_property(PropertyDefinition::id("id", features.id_type))
        .add_property(PropertyDefinition::new("name", PropertyType::String))
        .add_property(PropertyDefinition::array("roles", PropertyType::Object))
        .add_property(PropertyDefinition::new("address", PropertyType::Object))
        .build();
    let db = given_test_datasource("nested");
    db.automigrate(&[user.clone()]).await?;
    let users = DefaultCrudRepository::<Document>::with_definition(user, db);

    let data = json!({
        "name": "foo",
        "roles": [{"name": "admin"}, {"name": "user"}],
        "address": {"street": "backstreet"}
    });
    let created = users.create(data.clone()).await?;
    let id = created
        .get("id")
        .and_then(EntityId::from_value)
        .ok_or_else(|| anyhow::anyhow!("user has no id"))?;

    let stored = users.find_by_id(&id, None).await?;
    assert!(contains_deep(&to_json(&stored)?, &data));
    Ok(())
}

pub async fn rejects_scalars_in_an_array_of_objects(features: CrudFeatures) -> anyhow::Result<()> {
    let user = ModelDefinition::new("User")
        .add_property(PropertyDefinition::id("id", features.id_type))
        .add_property(PropertyDefinition::array("roles", PropertyType::Object))
        .build();
    let users =
        DefaultCrudRepository::<Document>::with_definition(user, given_test_datasource("nested"));

    let result = users.create(json!({"roles": ["admin"]})).await;
    assert!(matches!(result, Err(RepositoryError::Validation { .. })));
    Ok(())
}
