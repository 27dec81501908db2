//! # Core Types
//!
//! Domain types shared by the search service, the index adapter and the
//! catalog client.
//!
//! JSON field names follow the catalog's wire format (`descripcion`,
//! `precio`, `tipo`, ...) so documents round-trip unchanged between the
//! catalog, the index and the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Searchable projection of a catalog product
///
/// The catalog is the source of truth; the index holds a denormalized,
/// eventually consistent copy of these documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDocument {
    pub id: String,

    pub name: String,

    #[serde(rename = "descripcion")]
    pub description: String,

    #[serde(rename = "precio")]
    pub price: f64,

    pub stock: i64,

    #[serde(rename = "tipo")]
    pub product_type: String,

    #[serde(rename = "estacion")]
    pub season: String,

    #[serde(rename = "ocasion")]
    pub occasion: String,

    #[serde(rename = "genero")]
    pub gender: String,

    #[serde(rename = "marca")]
    pub brand: String,

    /// Free-form tags
    #[serde(rename = "notas", deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ProductDocument {
    /// Create a document with only its identifier and name set
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Treat an explicit JSON `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
