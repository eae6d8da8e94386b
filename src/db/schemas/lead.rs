//! Lead document schema
//!
//! The central entity: a customer inquiry directed at a partner's service.
//! Descriptive fields are fixed at creation; the lifecycle fields (status,
//! reason, offer, note, date_completed) only move through the transition
//! table in `leads::transition`.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for leads
pub const LEAD_COLLECTION: &str = "leads";

/// Lead lifecycle status.
///
/// Serialized as the exact capitalized strings the API and the database use.
/// Anything else (including the frontend's dangling `"Modify"` action) does
/// not parse and is rejected as an invalid transition.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LeadStatus {
    #[default]
    Pending,
    Pool,
    Active,
    Complete,
}

impl LeadStatus {
    /// Parse the wire string; `None` for unrecognized values
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(LeadStatus::Pending),
            "Pool" => Some(LeadStatus::Pool),
            "Active" => Some(LeadStatus::Active),
            "Complete" => Some(LeadStatus::Complete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "Pending",
            LeadStatus::Pool => "Pool",
            LeadStatus::Active => "Active",
            LeadStatus::Complete => "Complete",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer wants to be contacted
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    #[default]
    Text,
    Email,
    Call,
}

impl ContactMethod {
    /// Parse the wire string; `None` for unrecognized values
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ContactMethod::Text),
            "email" => Some(ContactMethod::Email),
            "call" => Some(ContactMethod::Call),
            _ => None,
        }
    }
}

/// Lead document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LeadDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    // === Immutable descriptive fields ===
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub contact_method: ContactMethod,
    pub address: String,
    pub service_request_date: DateTime,
    pub details: String,

    /// Final storage URLs of uploaded inquiry media
    #[serde(default)]
    pub uploaded_media: Vec<String>,

    /// Service being inquired about
    pub service: ObjectId,

    /// Location the inquiry targets
    pub location: ObjectId,

    // === Parties ===
    /// Inquiring account
    pub user: ObjectId,

    /// Owner of the service; fixed at creation, never changes
    pub partner: ObjectId,

    /// Messaging thread created alongside this lead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ObjectId>,

    // === Lifecycle fields ===
    #[serde(default)]
    pub status: LeadStatus,

    /// Fixed reason string set by declining/terminal transitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Counter-offer set by the user on the Pool -> Active transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,

    /// Free-text annotation, writable only by the assigned partner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Stamped when the partner completes an active lead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<DateTime>,
}

impl Default for LeadDoc {
    fn default() -> Self {
        Self {
            _id: Default::default(),
            metadata: Default::default(),
            customer_name: Default::default(),
            email: Default::default(),
            phone: Default::default(),
            contact_method: Default::default(),
            address: Default::default(),
            service_request_date: DateTime::from_millis(0),
            details: Default::default(),
            uploaded_media: Default::default(),
            service: Default::default(),
            location: Default::default(),
            user: Default::default(),
            partner: Default::default(),
            conversation_id: Default::default(),
            status: Default::default(),
            reason: Default::default(),
            offer: Default::default(),
            note: Default::default(),
            date_completed: Default::default(),
        }
    }
}

impl IntoIndexes for LeadDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Partner dashboards filter by status
            (
                doc! { "partner": 1, "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("partner_status_index".to_string())
                        .build(),
                ),
            ),
            // User lead lists filter by status
            (
                doc! { "user": 1, "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_status_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "conversation_id": 1 },
                Some(
                    IndexOptions::builder()
                        .sparse(true)
                        .name("conversation_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for LeadDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_exact_wire_strings() {
        for (status, s) in [
            (LeadStatus::Pending, "Pending"),
            (LeadStatus::Pool, "Pool"),
            (LeadStatus::Active, "Active"),
            (LeadStatus::Complete, "Complete"),
        ] {
            assert_eq!(status.as_str(), s);
            assert_eq!(LeadStatus::parse(s), Some(status));
            assert_eq!(serde_json::to_value(status).unwrap(), s);
        }
    }

    #[test]
    fn test_unrecognized_status_does_not_parse() {
        assert_eq!(LeadStatus::parse("Modify"), None);
        assert_eq!(LeadStatus::parse("pending"), None);
        assert_eq!(LeadStatus::parse(""), None);
    }

    #[test]
    fn test_contact_method_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_value(ContactMethod::Email).unwrap(),
            "email"
        );
        assert_eq!(ContactMethod::parse("call"), Some(ContactMethod::Call));
        assert_eq!(ContactMethod::parse("Call"), None);
    }

    #[test]
    fn test_new_lead_defaults_to_pending() {
        let lead = LeadDoc::default();
        assert_eq!(lead.status, LeadStatus::Pending);
        assert!(lead.reason.is_none());
        assert!(lead.offer.is_none());
        assert!(lead.date_completed.is_none());
    }
}
