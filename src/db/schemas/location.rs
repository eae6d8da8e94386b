//! Location document schema
//!
//! A physical location a partner operates from. Lead creation validates the
//! requested location exists; lead views show its name.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for locations
pub const LOCATION_COLLECTION: &str = "locations";

/// Location document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LocationDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Partner account operating this location
    pub partner_id: ObjectId,

    pub location_name: String,

    #[serde(default)]
    pub address: String,
}

impl LocationDoc {
    /// Projection of the fields lead views expose about a location
    pub fn summary(&self) -> LocationSummary {
        LocationSummary {
            id: self._id,
            location_name: self.location_name.clone(),
        }
    }
}

/// Location fields attached to populated lead views
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub location_name: String,
}

impl IntoIndexes for LocationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "partner_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("partner_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for LocationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
