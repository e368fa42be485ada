//! CRUD behaviour of `DefaultCrudRepository` on the memory connector.

use loopback_repository::prelude::*;
use loopback_schema::{PropertyDefinition, PropertyType};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    id: Option<i64>,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<serde_json::Value>,
}

impl Entity for Note {
    fn definition() -> Arc<ModelDefinition> {
        static DEFINITION: OnceLock<Arc<ModelDefinition>> = OnceLock::new();
        DEFINITION
            .get_or_init(|| {
                ModelDefinition::new("Note")
                    .add_property(PropertyDefinition::id("id", PropertyType::Number))
                    .add_property(PropertyDefinition::new("title", PropertyType::String).required())
                    .add_property(PropertyDefinition::new("content", PropertyType::String))
                    .add_property(PropertyDefinition::array("tags", PropertyType::String))
                    .add_property(PropertyDefinition::new("meta", PropertyType::Object))
                    .build()
            })
            .clone()
    }
}

fn repository() -> DefaultCrudRepository<Note> {
    DefaultCrudRepository::new(DataSource::memory("db"))
}

// ============================================================================
// Create / find
// ============================================================================

#[tokio::test]
async fn test_create_and_find_by_id() -> anyhow::Result<()> {
    let notes = repository();
    let created = notes
        .create(json!({"title": "groceries", "content": "milk"}))
        .await?;
    assert_eq!(created.id, Some(1));

    let found = notes.find_by_id(&EntityId::from(1), None).await?;
    assert_eq!(found, created);
    assert!(notes.exists(&EntityId::from(1)).await?);
    assert!(!notes.exists(&EntityId::from(2)).await?);
    Ok(())
}

#[tokio::test]
async fn test_nested_properties_round_trip() -> anyhow::Result<()> {
    let notes = repository();
    let created = notes
        .create(json!({
            "title": "trip",
            "tags": ["travel", "paris"],
            "meta": {"pinned": true, "color": {"r": 255}}
        }))
        .await?;

    let found = notes.find_by_id(&created.id.unwrap().into(), None).await?;
    assert_eq!(found.tags, vec!["travel".to_string(), "paris".to_string()]);
    assert_eq!(found.meta, Some(json!({"pinned": true, "color": {"r": 255}})));
    Ok(())
}

#[tokio::test]
async fn test_find_with_filter() -> anyhow::Result<()> {
    let notes = repository();
    notes
        .create_all(vec![
            json!({"title": "a", "tags": ["x"]}),
            json!({"title": "b"}),
            json!({"title": "c", "tags": ["x", "y"]}),
        ])
        .await?;

    let filter: Filter = serde_json::from_value(json!({
        "where": {"tags": "x"},
        "order": "title DESC"
    }))?;
    let titles: Vec<String> = notes
        .find(Some(filter))
        .await?
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, vec!["c", "a"]);

    let first = notes.find_one(None).await?;
    assert_eq!(first.map(|n| n.title), Some("a".to_string()));
    assert_eq!(notes.count(None).await?, Count { count: 3 });
    Ok(())
}

#[tokio::test]
async fn test_find_by_id_missing() {
    let err = repository()
        .find_by_id(&EntityId::from(42), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Entity not found: Note with id 42");
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_strict_model_rejects_unknown_property() {
    let err = repository()
        .create(json!({"title": "x", "color": "red"}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::UndefinedProperty { ref property, .. } if property == "color"
    ));
}

#[tokio::test]
async fn test_required_and_types_are_checked() {
    let err = repository()
        .create(json!({"content": 3}))
        .await
        .unwrap_err();
    match err {
        RepositoryError::Validation { entity_name, details } => {
            assert_eq!(entity_name, "Note");
            assert_eq!(
                details,
                vec![
                    "`content` is not a valid string".to_string(),
                    "`title` can't be blank".to_string()
                ]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_strict_model_keeps_extra_properties() -> anyhow::Result<()> {
    let definition = ModelDefinition::new("Event")
        .add_property(PropertyDefinition::id("id", PropertyType::String))
        .strict(false)
        .build();
    let events =
        DefaultCrudRepository::<Document>::with_definition(definition, DataSource::memory("db"));

    let event = events.create(json!({"kind": "login", "at": 1})).await?;
    assert_eq!(event["kind"], json!("login"));
    assert!(event["id"].is_string());
    Ok(())
}

// ============================================================================
// Update / replace / save / delete
// ============================================================================

#[tokio::test]
async fn test_update_by_id_and_update_all() -> anyhow::Result<()> {
    let notes = repository();
    notes
        .create_all(vec![json!({"title": "a"}), json!({"title": "b"})])
        .await?;

    notes
        .update_by_id(&EntityId::from(1), json!({"content": "first"}))
        .await?;
    assert_eq!(
        notes.find_by_id(&EntityId::from(1), None).await?.content,
        Some("first".to_string())
    );

    let count = notes
        .update_all(json!({"content": "bulk"}), Some(Where::eq("title", "b")))
        .await?;
    assert_eq!(count.count, 1);

    let err = notes
        .update_by_id(&EntityId::from(9), json!({"content": "x"}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = notes
        .update_by_id(&EntityId::from(1), json!({"id": 2}))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidData { .. }));
    Ok(())
}

#[tokio::test]
async fn test_replace_drops_unset_properties() -> anyhow::Result<()> {
    let notes = repository();
    let note = notes
        .create(json!({"title": "a", "content": "long text"}))
        .await?;
    let id = EntityId::from(note.id.unwrap());

    notes.replace_by_id(&id, json!({"title": "b"})).await?;
    let replaced = notes.find_by_id(&id, None).await?;
    assert_eq!(replaced.title, "b");
    assert_eq!(replaced.content, None);
    Ok(())
}

#[tokio::test]
async fn test_save_creates_then_replaces() -> anyhow::Result<()> {
    let notes = repository();
    let mut note = notes
        .save(&Note {
            id: None,
            title: "draft".into(),
            content: None,
            tags: vec![],
            meta: None,
        })
        .await?;
    assert_eq!(note.id, Some(1));

    note.title = "final".into();
    let saved = notes.save(&note).await?;
    assert_eq!(saved.title, "final");
    assert_eq!(notes.count(None).await?.count, 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_by_id_and_delete_all() -> anyhow::Result<()> {
    let notes = repository();
    notes
        .create_all(vec![
            json!({"title": "a"}),
            json!({"title": "b"}),
            json!({"title": "c"}),
        ])
        .await?;

    notes.delete_by_id(&EntityId::from(2)).await?;
    assert!(notes.delete_by_id(&EntityId::from(2)).await.unwrap_err().is_not_found());

    let deleted = notes.delete_all(None).await?;
    assert_eq!(deleted.count, 2);
    Ok(())
}
