//! Store / Product / Variant / Category fixture domain shared by integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use doctrack_core::{Entity, EntitySchema, FieldValue, GeoPoint, MetadataRegistry, Record};

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Address {
    pub fn new(street: &str, city: &str) -> Self {
        Self {
            street: street.to_string(),
            city: city.to_string(),
        }
    }

    fn to_value(&self) -> FieldValue {
        let mut map = BTreeMap::new();
        map.insert("street".to_string(), FieldValue::from(&self.street));
        map.insert("city".to_string(), FieldValue::from(&self.city));
        FieldValue::Map(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub id: String,
    pub color: String,
}

impl Entity for Variant {
    fn schema() -> EntitySchema {
        EntitySchema::new("Variant").id("id").field("color")
    }

    fn to_record(&self) -> Record {
        Record::new("Variant")
            .with("id", &self.id)
            .with("color", &self.color)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub qty: i64,
    pub category: Option<Category>,
    pub variants: Vec<Variant>,
}

impl Product {
    pub fn new(id: &str, name: &str, qty: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            qty,
            category: None,
            variants: Vec::new(),
        }
    }
}

impl Entity for Product {
    fn schema() -> EntitySchema {
        EntitySchema::new("Product")
            .id("id")
            .field("name")
            .field("qty")
            .reference("category", "Category")
            .collection("variants", "Variant")
    }

    fn to_record(&self) -> Record {
        Record::new("Product")
            .with("id", &self.id)
            .with("name", &self.name)
            .with("qty", self.qty)
            .with("category", self.category.as_ref().map(Entity::to_record))
            .with(
                "variants",
                self.variants
                    .iter()
                    .map(Entity::to_record)
                    .collect::<Vec<_>>(),
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Entity for Category {
    fn schema() -> EntitySchema {
        EntitySchema::new("Category")
            .id("id")
            .field("name")
            .aggregate_root()
    }

    fn to_record(&self) -> Record {
        Record::new("Category")
            .with("id", &self.id)
            .with("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub note: Option<String>,
    pub address: Option<Address>,
    pub location: Option<GeoPoint>,
    pub tags: Vec<String>,
    pub category: Option<Category>,
    pub products: Vec<Product>,
}

impl Store {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            note: None,
            address: None,
            location: None,
            tags: Vec::new(),
            category: None,
            products: Vec::new(),
        }
    }
}

impl Entity for Store {
    fn schema() -> EntitySchema {
        EntitySchema::new("Store")
            .id("id")
            .field("name")
            .field("note")
            .field("address")
            .geopoint("location")
            .field("tags")
            .reference("category", "Category")
            .collection("products", "Product")
    }

    fn to_record(&self) -> Record {
        Record::new("Store")
            .with("id", &self.id)
            .with("name", &self.name)
            .with("note", self.note.clone())
            .with(
                "address",
                self.address.as_ref().map_or(FieldValue::Null, Address::to_value),
            )
            .with("location", self.location)
            .with("tags", self.tags.clone())
            .with("category", self.category.as_ref().map(Entity::to_record))
            .with(
                "products",
                self.products
                    .iter()
                    .map(Entity::to_record)
                    .collect::<Vec<_>>(),
            )
    }
}

pub fn registry() -> Arc<MetadataRegistry> {
    Arc::new(
        MetadataRegistry::builder()
            .register::<Store>()
            .register::<Product>()
            .register::<Variant>()
            .register::<Category>()
            .build()
            .expect("fixture registry is valid"),
    )
}

/// Store s1 with one product p1 (qty 1) carrying one variant v1
pub fn sample_store() -> Store {
    let mut product = Product::new("p1", "Widget", 1);
    product.variants.push(Variant {
        id: "v1".to_string(),
        color: "red".to_string(),
    });
    let mut store = Store::new("s1", "Main");
    store.products.push(product);
    store.tags = vec!["a".to_string(), "b".to_string()];
    store
}
