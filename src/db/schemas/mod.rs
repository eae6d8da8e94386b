//! Database schemas for Leadhub
//!
//! Defines MongoDB document structures for users, services, locations,
//! leads, and conversations.

mod conversation;
mod lead;
mod location;
mod metadata;
mod service;
mod user;

pub use conversation::{ConversationDoc, ConversationKind, CONVERSATION_COLLECTION};
pub use lead::{ContactMethod, LeadDoc, LeadStatus, LEAD_COLLECTION};
pub use location::{LocationDoc, LocationSummary, LOCATION_COLLECTION};
pub use metadata::Metadata;
pub use service::{ServiceDoc, ServiceSummary, SERVICE_COLLECTION};
pub use user::{UserDoc, UserSummary, USER_COLLECTION};
