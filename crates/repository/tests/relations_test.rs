//! Relation accessors over runtime-defined models (`T = Document`).

use loopback_repository::prelude::*;
use loopback_repository::ResolvedRelation;
use loopback_schema::{PropertyDefinition, PropertyType, TypeResolver};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

struct Fixture {
    authors: Arc<DefaultCrudRepository<Document>>,
    books: Arc<DefaultCrudRepository<Document>>,
}

fn fixture() -> Fixture {
    let book_target = ModelDefinition::new("Book")
        .add_property(PropertyDefinition::id("id", PropertyType::Number))
        .add_property(PropertyDefinition::new("authorId", PropertyType::Number))
        .build();
    let author = ModelDefinition::new("Author")
        .add_property(PropertyDefinition::id("id", PropertyType::Number))
        .add_property(PropertyDefinition::new("name", PropertyType::String))
        .has_many("books", TypeResolver::from_definition(book_target.clone()))
        .has_one("bio", TypeResolver::from_definition(book_target))
        .build();
    let book = ModelDefinition::new("Book")
        .add_property(PropertyDefinition::id("id", PropertyType::Number))
        .add_property(PropertyDefinition::new("title", PropertyType::String))
        .belongs_to("authorId", TypeResolver::from_definition(author.clone()))
        .build();

    let db = DataSource::memory("db");
    Fixture {
        authors: Arc::new(DefaultCrudRepository::with_definition(author, db.clone())),
        books: Arc::new(DefaultCrudRepository::with_definition(book, db)),
    }
}

fn books_getter(fixture: &Fixture) -> Getter<dyn EntityCrudRepository<Document>> {
    Getter::from_value(fixture.books.clone())
        .map(|repo| repo as Arc<dyn EntityCrudRepository<Document>>)
}

fn authors_getter(fixture: &Fixture) -> Getter<dyn EntityCrudRepository<Document>> {
    Getter::from_value(fixture.authors.clone())
        .map(|repo| repo as Arc<dyn EntityCrudRepository<Document>>)
}

#[tokio::test]
async fn test_has_many_scopes_by_source_id() -> anyhow::Result<()> {
    let fixture = fixture();
    let books = fixture
        .authors
        .create_has_many_repository_factory_for("books", books_getter(&fixture))?;
    let relation: &ResolvedRelation = books.relation();
    assert_eq!(relation.key_from, "id");
    assert_eq!(relation.key_to, "authorId");

    books.of(1).create(json!({"title": "one"})).await?;
    books.of(2).create(json!({"title": "two"})).await?;
    books.of(1).create(json!({"title": "three"})).await?;

    let titles: Vec<_> = books
        .of(1)
        .find(None)
        .await?
        .into_iter()
        .map(|b| b["title"].clone())
        .collect();
    assert_eq!(titles, vec![json!("one"), json!("three")]);
    Ok(())
}

#[tokio::test]
async fn test_belongs_to_resolves_author() -> anyhow::Result<()> {
    let fixture = fixture();
    let author = fixture.authors.create(json!({"name": "Ursula"})).await?;
    let book = fixture
        .books
        .create(json!({"title": "Earthsea", "authorId": author["id"].clone()}))
        .await?;
    let orphan = fixture.books.create(json!({"title": "Anonymous"})).await?;

    let author_of = fixture
        .books
        .create_belongs_to_accessor_for("author", authors_getter(&fixture))?;
    let found = author_of.get(&EntityId::from_value(&book["id"]).unwrap()).await?;
    assert_eq!(found["name"], json!("Ursula"));

    let err = author_of
        .get(&EntityId::from_value(&orphan["id"]).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::RelatedEntityNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_unknown_relation_is_invalid() {
    let fixture = fixture();
    let err = fixture
        .authors
        .create_has_many_repository_factory_for("reviews", books_getter(&fixture))
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InvalidRelation { ref relation, ref source_model, .. }
            if relation == "reviews" && source_model == "Author"
    ));
}

#[tokio::test]
async fn test_navigational_property_is_rejected() {
    let fixture = fixture();
    let err = fixture
        .authors
        .create(json!({"name": "x", "books": []}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::UndefinedProperty { ref property, .. } if property == "books"
    ));
}

#[tokio::test]
async fn test_has_one_single_target() -> anyhow::Result<()> {
    let fixture = fixture();
    let bio = fixture
        .authors
        .create_has_one_repository_factory_for("bio", books_getter(&fixture))?;

    assert!(bio.of(7).get(None).await.unwrap_err().is_not_found());
    bio.of(7).create(json!({"title": "About me"})).await?;
    let err = bio.of(7).create(json!({"title": "Again"})).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateRelatedEntity { .. }));

    assert_eq!(bio.of(7).get(None).await?["title"], json!("About me"));
    assert_eq!(bio.of(7).delete().await?.count, 1);
    Ok(())
}
