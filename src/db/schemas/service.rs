//! Service document schema
//!
//! A service is a partner's offering that users inquire about. Leads only
//! read services, never write them; the fields here are the ones lead
//! creation validates against and lead views project.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for services
pub const SERVICE_COLLECTION: &str = "services";

/// Service document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ServiceDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning partner account. Leads derive their `partner` from this field.
    pub user: ObjectId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub images: Vec<String>,

    /// Pricing model (e.g. "fixed", "range", "quote")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl ServiceDoc {
    /// Projection of the fields lead views expose about a service
    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            id: self._id,
            name: self.name.clone(),
            description: self.description.clone(),
            images: self.images.clone(),
            price_type: self.price_type.clone(),
            price: self.price,
            price_range: self.price_range.clone(),
            rating: self.rating,
        }
    }
}

/// Service fields attached to populated lead views
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl IntoIndexes for ServiceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user": 1 },
            Some(IndexOptions::builder().name("owner_index".to_string()).build()),
        )]
    }
}

impl MutMetadata for ServiceDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
