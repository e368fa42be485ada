use loopback_schema::{
    EntityId, ModelDefinition, PropertyDefinition, PropertyType, RelationDefinition, SchemaError,
    TypeResolver,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::CrudFeatures;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub description: String,
    #[serde(default)]
    pub is_shipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<EntityId>,
    #[serde(rename = "shipment_id", default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Default)]
struct Cells {
    customer: OnceLock<Arc<ModelDefinition>>,
    order: OnceLock<Arc<ModelDefinition>>,
    shipment: OnceLock<Arc<ModelDefinition>>,
    address: OnceLock<Arc<ModelDefinition>>,
}

type Cell = fn(&Cells) -> &OnceLock<Arc<ModelDefinition>>;

fn resolver(cells: &Arc<Cells>, model: &'static str, cell: Cell) -> TypeResolver {
    let cells = Arc::downgrade(cells);
    TypeResolver::new(move || {
        let cells = cells
            .upgrade()
            .ok_or_else(|| SchemaError::RegistryDropped(model.to_string()))?;
        cell(&cells)
            .get()
            .cloned()
            .ok_or_else(|| SchemaError::UnknownModel(model.to_string()))
    })
}

/// Definitions of the fixture models, with ids of `features.id_type`.
///
/// Relation targets resolve only while this value is alive.
pub struct FixtureModels {
    cells: Arc<Cells>,
    pub product: Arc<ModelDefinition>,
}

impl FixtureModels {
    pub fn new(features: &CrudFeatures) -> Self {
        let cells = Arc::new(Cells::default());
        let id_type = features.id_type;
        let customer = || resolver(&cells, "Customer", |c| &c.customer);
        let order = || resolver(&cells, "Order", |c| &c.order);
        let shipment = || resolver(&cells, "Shipment", |c| &c.shipment);
        let address = || resolver(&cells, "Address", |c| &c.address);

        let customer_definition = ModelDefinition::new("Customer")
            .add_property(PropertyDefinition::id("id", id_type))
            .add_property(PropertyDefinition::new("name", PropertyType::String))
            .add_property(PropertyDefinition::new("parentId", id_type))
            .has_many("orders", order())
            .has_one("address", address())
            .add_relation(RelationDefinition::has_many("customers", customer()).key_to("parentId"))
            .belongs_to("parentId", customer())
            .build();

        let order_definition = ModelDefinition::new("Order")
            .add_property(PropertyDefinition::id("id", id_type))
            .add_property(PropertyDefinition::new("description", PropertyType::String).required())
            .add_property(
                PropertyDefinition::new("isShipped", PropertyType::Boolean).with_default(false),
            )
            .add_property(PropertyDefinition::new("customerId", id_type))
            .add_property(PropertyDefinition::new("shipment_id", id_type))
            .belongs_to("customerId", customer())
            .belongs_to_named("shipment_id", "shipment", shipment())
            .build();

        let shipment_definition = ModelDefinition::new("Shipment")
            .add_property(PropertyDefinition::id("id", id_type))
            .add_property(PropertyDefinition::new("name", PropertyType::String))
            .add_relation(
                RelationDefinition::has_many("shipmentOrders", order()).key_to("shipment_id"),
            )
            .build();

        let address_definition = ModelDefinition::new("Address")
            .add_property(PropertyDefinition::id("id", id_type))
            .add_property(PropertyDefinition::new("street", PropertyType::String))
            .add_property(PropertyDefinition::new("zipcode", PropertyType::String))
            .add_property(PropertyDefinition::new("city", PropertyType::String))
            .add_property(PropertyDefinition::new("province", PropertyType::String))
            .add_property(PropertyDefinition::new("customerId", id_type))
            .belongs_to("customerId", customer())
            .build();

        let product = ModelDefinition::new("Product")
            .add_property(PropertyDefinition::id("id", id_type))
            .add_property(PropertyDefinition::new("name", PropertyType::String))
            .add_property(PropertyDefinition::new("slug", PropertyType::String))
            .build();

        // Freshly created cells are empty, so none of these can fail.
        let _ = cells.customer.set(customer_definition);
        let _ = cells.order.set(order_definition);
        let _ = cells.shipment.set(shipment_definition);
        let _ = cells.address.set(address_definition);

        Self { cells, product }
    }

    fn definition(&self, cell: Cell, model: &str) -> anyhow::Result<Arc<ModelDefinition>> {
        cell(&self.cells)
            .get()
            .cloned()
            .ok_or_else(|| SchemaError::UnknownModel(model.to_string()).into())
    }

    pub fn customer(&self) -> anyhow::Result<Arc<ModelDefinition>> {
        self.definition(|c| &c.customer, "Customer")
    }

    pub fn order(&self) -> anyhow::Result<Arc<ModelDefinition>> {
        self.definition(|c| &c.order, "Order")
    }

    pub fn shipment(&self) -> anyhow::Result<Arc<ModelDefinition>> {
        self.definition(|c| &c.shipment, "Shipment")
    }

    pub fn address(&self) -> anyhow::Result<Arc<ModelDefinition>> {
        self.definition(|c| &c.address, "Address")
    }
}
