//! Booting a project directory into an application.

use http::StatusCode;
use loopback_rest_crud::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;

fn write_json(root: &Path, relative: &str, value: Value) -> anyhow::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn project() -> anyhow::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();

    write_json(
        root,
        "datasources/db.datasource.json",
        json!({"name": "db", "connector": "memory"}),
    )?;

    write_json(root, "models/product.model.json", json!({
        "name": "Product",
        "properties": {
            "id": {"type": "number", "id": true, "generated": true},
            "name": {"type": "string", "required": true},
            "categoryId": {"type": "number"}
        },
        "relations": {
            "category": {"type": "belongsTo", "model": "Category"}
        }
    }))?;
    write_json(root, "models/category.model.json", json!({
        "name": "Category",
        "properties": {
            "id": {"type": "number", "id": true, "generated": true},
            "name": {"type": "string"}
        },
        "relations": {
            "products": {"type": "hasMany", "model": "Product"}
        }
    }))?;
    write_json(root, "models/address.model.json", json!({
        "name": "Address",
        "properties": {"street": {"type": "string"}}
    }))?;

    write_json(root, "public-models/product.config.json", json!({
        "model": "Product",
        "pattern": "CrudRest",
        "dataSource": "db",
        "basePath": "/products"
    }))?;
    write_json(root, "public-models/nested/category.config.json", json!({
        "model": "Category",
        "pattern": "CrudRest",
        "dataSource": "db",
        "basePath": "/categories",
        "readonly": true
    }))?;
    write_json(root, "public-models/address.config.json", json!({
        "model": "Address",
        "pattern": "CrudRest",
        "dataSource": "db",
        "basePath": "/addresses"
    }))?;
    write_json(root, "public-models/key-value.config.json", json!({
        "model": "Product",
        "pattern": "KeyValue",
        "dataSource": "db",
        "basePath": "/kv"
    }))?;
    Ok(dir)
}

// ============================================================================
// Rest booter
// ============================================================================

#[tokio::test]
async fn test_failing_artefacts_do_not_abort_boot() -> anyhow::Result<()> {
    let dir = project()?;
    let app = Application::new();
    let report = boot_project(&app, dir.path()).await?;

    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .any(|f| matches!(f.error, BootError::InvalidModelKind(ref m) if m == "Address")));
    assert!(report.failures.iter().any(|f| matches!(
        f.error,
        BootError::UnsupportedPattern { ref pattern, .. } if pattern == "KeyValue"
    )));

    let keys = app.binding_keys();
    for key in [
        "controllers.CategoryController",
        "controllers.ProductController",
        "datasources.db",
        "models.Address",
        "models.Category",
        "models.Product",
        "repositories.CategoryRepository",
        "repositories.ProductRepository",
    ] {
        assert!(keys.contains(&key.to_string()), "missing binding {}", key);
    }
    assert!(!keys.contains(&"controllers.AddressController".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_nested_option_limits_discovery() -> anyhow::Result<()> {
    let dir = project()?;
    let flat = RestBooter::with_options(
        dir.path(),
        RestBooterOptions {
            nested: false,
            ..Default::default()
        },
    );
    let found = flat.discover()?;
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|p| !p.to_string_lossy().contains("nested")));

    assert_eq!(RestBooter::new(dir.path()).discover()?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_unknown_model_and_datasource() -> anyhow::Result<()> {
    let app = Application::new();
    let err = app
        .setup_model_api(&ModelApiConfig::crud_rest("Ghost", "db", "/ghosts"))
        .await
        .unwrap_err();
    assert!(matches!(err, BootError::UnknownModel(ref m) if m == "Ghost"));

    let dir = project()?;
    ModelBooter::new(dir.path()).load(&app).await?;
    let err = app
        .setup_model_api(&ModelApiConfig::crud_rest("Product", "nowhere", "/products"))
        .await
        .unwrap_err();
    assert!(matches!(err, BootError::UnknownDataSource(ref d) if d == "nowhere"));
    Ok(())
}

#[tokio::test]
async fn test_booted_relations_resolve_lazily() -> anyhow::Result<()> {
    let dir = project()?;
    let app = Application::new();
    ModelBooter::new(dir.path()).load(&app).await?;

    let category = app.model("Category")?;
    let products = category.relation("products").expect("products relation");
    assert_eq!(products.target_model()?.name(), "Product");
    Ok(())
}

// ============================================================================
// Synthesized API
// ============================================================================

#[tokio::test]
async fn test_booted_controller_serves_crud_routes() -> anyhow::Result<()> {
    let dir = project()?;
    let app = Application::new();
    boot_project(&app, dir.path()).await?;

    let created = app
        .handle(RestRequest::post("/products", json!({"name": "pen", "categoryId": 1})))
        .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body, Some(json!({"id": 1, "name": "pen", "categoryId": 1})));

    let count = app.handle(RestRequest::get("/products/count")).await;
    assert_eq!(count.body, Some(json!({"count": 1})));

    let readonly = app
        .handle(RestRequest::post("/categories", json!({"name": "office"})))
        .await;
    assert_eq!(readonly.status, StatusCode::NOT_FOUND);

    let listed = app.handle(RestRequest::get("/categories")).await;
    assert_eq!(listed.body, Some(json!([])));
    Ok(())
}
