//! CRUD controller routes mapped onto repository operations.

use http::{Method, StatusCode};
use loopback_repository::DataSource;
use loopback_rest_crud::*;
use loopback_schema::{ModelDefinition, PropertyDefinition, PropertyType};
use pretty_assertions::assert_eq;
use serde_json::json;

async fn app() -> anyhow::Result<Application> {
    let app = Application::new();
    app.bind_datasource(DataSource::memory("db"));
    app.bind_model(
        ModelDefinition::new("Product")
            .add_property(PropertyDefinition::id("id", PropertyType::Number))
            .add_property(PropertyDefinition::new("name", PropertyType::String).required())
            .add_property(PropertyDefinition::new("price", PropertyType::Number))
            .build(),
    );
    app.setup_model_api(&ModelApiConfig::crud_rest("Product", "db", "/products"))
        .await?;
    for (name, price) in [("pen", 2), ("ink", 10), ("pad", 5)] {
        let response = app
            .handle(RestRequest::post("/products", json!({"name": name, "price": price})))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
    Ok(app)
}

#[tokio::test]
async fn test_find_with_filter_query() -> anyhow::Result<()> {
    let app = app().await?;
    let request = RestRequest::parse(
        Method::GET,
        concat!(
            "/products?filter=",
            "%7B%22where%22%3A%7B%22price%22%3A%7B%22gt%22%3A3%7D%7D",
            "%2C%22order%22%3A%22price%20DESC%22%7D",
        ),
    )?;
    let response = app.handle(request).await;
    assert_eq!(
        response.body,
        Some(json!([
            {"id": 2, "name": "ink", "price": 10},
            {"id": 3, "name": "pad", "price": 5}
        ]))
    );
    Ok(())
}

#[tokio::test]
async fn test_find_by_id_and_not_found() -> anyhow::Result<()> {
    let app = app().await?;
    let found = app.handle(RestRequest::get("/products/1")).await;
    assert_eq!(found.body, Some(json!({"id": 1, "name": "pen", "price": 2})));

    let missing = app.handle(RestRequest::get("/products/99")).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(
        missing.body.unwrap()["error"]["code"],
        json!("ENTITY_NOT_FOUND")
    );
    Ok(())
}

#[tokio::test]
async fn test_update_replace_delete() -> anyhow::Result<()> {
    let app = app().await?;

    let patched = app
        .handle(RestRequest::patch("/products/1", json!({"price": 3})))
        .await;
    assert_eq!(patched.status, StatusCode::NO_CONTENT);

    let bulk = app
        .handle(
            RestRequest::patch("/products", json!({"price": 0}))
                .with_query("where", r#"{"price": {"lt": 6}}"#),
        )
        .await;
    assert_eq!(bulk.body, Some(json!({"count": 2})));

    let replaced = app
        .handle(RestRequest::put("/products/2", json!({"name": "ink2"})))
        .await;
    assert_eq!(replaced.status, StatusCode::NO_CONTENT);
    let ink = app.handle(RestRequest::get("/products/2")).await;
    assert_eq!(ink.body, Some(json!({"id": 2, "name": "ink2"})));

    let deleted = app.handle(RestRequest::delete("/products/3")).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let count = app
        .handle(RestRequest::get("/products/count").with_query("where", r#"{"price": 0}"#))
        .await;
    assert_eq!(count.body, Some(json!({"count": 1})));
    Ok(())
}

#[tokio::test]
async fn test_errors_map_to_status_codes() -> anyhow::Result<()> {
    let app = app().await?;

    let invalid = app
        .handle(RestRequest::post("/products", json!({"price": 1})))
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);

    let unknown = app
        .handle(RestRequest::post("/products", json!({"name": "x", "color": "red"})))
        .await;
    assert_eq!(unknown.status, StatusCode::UNPROCESSABLE_ENTITY);

    let duplicate = app
        .handle(RestRequest::post("/products", json!({"id": 1, "name": "pen again"})))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(
        duplicate.body.as_ref().map(|b| b["error"]["code"].clone()),
        Some(json!("DUPLICATE_ID"))
    );

    let bad_filter = app
        .handle(RestRequest::get("/products").with_query("filter", "{not json"))
        .await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);

    let no_route = app.handle(RestRequest::get("/orders")).await;
    assert_eq!(no_route.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_routes_are_listed() -> anyhow::Result<()> {
    let app = app().await?;
    let routes = app.routes();
    assert_eq!(routes.len(), 8);
    assert!(routes.iter().any(|r| {
        r.method == Method::GET
            && r.path == "/products/count"
            && r.operation == CrudOperation::Count
    }));
    assert_eq!(
        app.controller("ProductController").map(|c| c.base_path().to_string()),
        Some("/products".to_string())
    );
    Ok(())
}
