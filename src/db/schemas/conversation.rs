//! Conversation document schema
//!
//! A messaging thread between two accounts. Lead-originated conversations
//! carry a back-reference to their lead, forming the bidirectional link
//! created during lead creation.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for conversations
pub const CONVERSATION_COLLECTION: &str = "conversations";

/// What spawned the conversation
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversationKind {
    /// Created alongside a lead, linking inquirer and partner
    Lead,
    /// Started directly between two accounts
    #[default]
    Direct,
}

/// Conversation document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConversationDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// The two accounts in the thread
    pub participants: Vec<ObjectId>,

    #[serde(rename = "type")]
    pub kind: ConversationKind,

    /// Back-reference to the originating lead.
    /// Absent until the lead insert succeeds and the thread is patched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead: Option<ObjectId>,
}

impl ConversationDoc {
    /// Create a lead-originated thread between the inquirer and the partner.
    ///
    /// The lead back-reference starts empty; the lead service patches it in
    /// once the lead record exists.
    pub fn lead_thread(user: ObjectId, partner: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            participants: vec![user, partner],
            kind: ConversationKind::Lead,
            lead: None,
        }
    }
}

impl IntoIndexes for ConversationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "participants": 1 },
                Some(
                    IndexOptions::builder()
                        .name("participants_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "lead": 1 },
                Some(
                    IndexOptions::builder()
                        .sparse(true)
                        .name("lead_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ConversationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_thread_has_both_participants_and_no_lead_ref() {
        let user = ObjectId::new();
        let partner = ObjectId::new();
        let conv = ConversationDoc::lead_thread(user, partner);

        assert_eq!(conv.participants, vec![user, partner]);
        assert_eq!(conv.kind, ConversationKind::Lead);
        assert!(conv.lead.is_none());
    }

    #[test]
    fn test_kind_serializes_as_type_field() {
        let conv = ConversationDoc::lead_thread(ObjectId::new(), ObjectId::new());
        let doc = bson::to_document(&conv).unwrap();
        assert_eq!(doc.get_str("type").unwrap(), "Lead");
    }
}
