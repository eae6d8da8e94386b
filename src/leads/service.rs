//! Lead operations: creation, status transitions, notes, and queries
//!
//! Every mutation is a single read-modify-write against one lead record.
//! Status transitions commit with a conditional update keyed on the status
//! the caller saw, so two racing transitions from the same snapshot cannot
//! both land.

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::future::try_join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{
    ContactMethod, ConversationDoc, LeadDoc, LeadStatus, LocationDoc, LocationSummary, ServiceDoc,
    ServiceSummary, UserDoc, UserSummary, CONVERSATION_COLLECTION, LEAD_COLLECTION,
    LOCATION_COLLECTION, SERVICE_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::leads::transition::{self, LeadRole, TransitionEffect, TransitionRequest};
use crate::media::{MediaFile, MediaStore};
use crate::types::{LeadhubError, Result};

/// Fields accepted when creating a lead
#[derive(Debug, Clone)]
pub struct CreateLeadInput {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub contact_method: ContactMethod,
    pub address: String,
    pub service_request_date: DateTime,
    pub details: String,
    pub service: ObjectId,
    pub location: ObjectId,
    pub files: Vec<MediaFile>,
}

/// A requested status change as received from the API
#[derive(Debug, Clone, Copy)]
pub struct StatusChange<'a> {
    pub status: &'a str,
    pub reason: Option<&'a str>,
    pub offer: Option<&'a str>,
}

/// A lead with the related summary fields attached for display
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    pub lead: LeadDoc,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Lead lifecycle manager
pub struct LeadService {
    leads: MongoCollection<LeadDoc>,
    conversations: MongoCollection<ConversationDoc>,
    services: MongoCollection<ServiceDoc>,
    locations: MongoCollection<LocationDoc>,
    users: MongoCollection<UserDoc>,
    media: Arc<dyn MediaStore>,
}

impl LeadService {
    pub async fn new(mongo: &MongoClient, media: Arc<dyn MediaStore>) -> Result<Self> {
        Ok(Self {
            leads: mongo.collection(LEAD_COLLECTION).await?,
            conversations: mongo.collection(CONVERSATION_COLLECTION).await?,
            services: mongo.collection(SERVICE_COLLECTION).await?,
            locations: mongo.collection(LOCATION_COLLECTION).await?,
            users: mongo.collection(USER_COLLECTION).await?,
            media,
        })
    }

    /// Create a lead together with its conversation thread.
    ///
    /// All media uploads must succeed before any record is written. The
    /// thread and the lead cross-reference each other; a failure after the
    /// thread insert soft-deletes the orphan so no half-linked pair remains.
    pub async fn create_lead(&self, caller: ObjectId, input: CreateLeadInput) -> Result<LeadDoc> {
        let service = self
            .services
            .find_one(doc! { "_id": input.service })
            .await?
            .ok_or_else(|| LeadhubError::NotFound("Service".into()))?;

        self.locations
            .find_one(doc! { "_id": input.location })
            .await?
            .ok_or_else(|| LeadhubError::NotFound("Location".into()))?;

        ensure_not_self_inquiry(service.user, caller)?;

        // Upload all media concurrently; any failure aborts the creation
        // before a single record is written.
        let uploads = input
            .files
            .iter()
            .map(|f| self.media.upload(f.data.clone(), &f.file_name, f.kind()));
        let uploaded_media = try_join_all(uploads).await?;

        // Thread first, without the lead back-reference
        let conversation_id = self
            .conversations
            .insert_one(ConversationDoc::lead_thread(caller, service.user))
            .await?;

        let lead = LeadDoc {
            _id: None,
            metadata: Default::default(),
            customer_name: input.customer_name,
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            contact_method: input.contact_method,
            address: input.address,
            service_request_date: input.service_request_date,
            details: input.details,
            uploaded_media,
            service: input.service,
            location: input.location,
            user: caller,
            partner: service.user,
            conversation_id: Some(conversation_id),
            status: LeadStatus::Pending,
            reason: None,
            offer: None,
            note: None,
            date_completed: None,
        };

        let lead_id = match self.leads.insert_one(lead).await {
            Ok(id) => id,
            Err(e) => {
                // Compensate: don't leave an orphan thread behind
                if let Err(del) = self
                    .conversations
                    .soft_delete(doc! { "_id": conversation_id })
                    .await
                {
                    warn!(
                        conversation = %conversation_id,
                        error = %del,
                        "Failed to remove orphan conversation after lead insert failure"
                    );
                }
                return Err(e);
            }
        };

        // Patch the thread with the lead reference, completing the link
        if let Err(e) = self
            .conversations
            .update_one(doc! { "_id": conversation_id }, doc! { "$set": { "lead": lead_id } })
            .await
        {
            if let Err(del) = self.leads.soft_delete(doc! { "_id": lead_id }).await {
                warn!(
                    lead = %lead_id,
                    error = %del,
                    "Failed to remove lead after conversation patch failure"
                );
            }
            if let Err(del) = self
                .conversations
                .soft_delete(doc! { "_id": conversation_id })
                .await
            {
                warn!(
                    conversation = %conversation_id,
                    error = %del,
                    "Failed to remove conversation after patch failure"
                );
            }
            return Err(e);
        }

        info!(
            lead = %lead_id,
            user = %caller,
            partner = %service.user,
            "Lead created"
        );

        self.leads
            .find_one(doc! { "_id": lead_id })
            .await?
            .ok_or_else(|| LeadhubError::Database("Lead missing after insert".into()))
    }

    /// Run a requested status change through the transition table and commit.
    pub async fn update_status(
        &self,
        caller: ObjectId,
        lead_id: ObjectId,
        change: StatusChange<'_>,
    ) -> Result<LeadDoc> {
        let requested = LeadStatus::parse(change.status).ok_or_else(|| {
            LeadhubError::InvalidTransition(format!("Unrecognized status '{}'", change.status))
        })?;

        let lead = self
            .leads
            .find_one(doc! { "_id": lead_id })
            .await?
            .ok_or_else(|| LeadhubError::NotFound("Lead".into()))?;

        let role = resolve_role(&lead, caller)?;

        let effect = transition::plan(
            lead.status,
            role,
            &TransitionRequest {
                status: requested,
                reason: change.reason,
                offer: change.offer,
            },
        )
        .map_err(|e| {
            warn!(
                lead = %lead_id,
                role = %role,
                current = %lead.status,
                requested = %requested,
                "Rejected transition: {}",
                e
            );
            LeadhubError::InvalidTransition(e.to_string())
        })?;

        // Conditional commit: the filter pins the status the caller saw, so
        // a concurrent transition from the same snapshot loses cleanly.
        let updated = self
            .leads
            .find_one_and_update(
                doc! { "_id": lead_id, "status": lead.status.as_str() },
                doc! { "$set": transition_set(&effect) },
            )
            .await?
            .ok_or_else(|| {
                LeadhubError::Conflict("Lead was modified concurrently, please retry".into())
            })?;

        info!(
            lead = %lead_id,
            role = %role,
            from = %lead.status,
            to = %effect.status,
            "Lead transitioned"
        );

        Ok(updated)
    }

    /// Set or replace the lead's note. Assigned partner only, any status.
    pub async fn add_note(&self, caller: ObjectId, lead_id: ObjectId, note: &str) -> Result<LeadDoc> {
        let lead = self
            .leads
            .find_one(doc! { "_id": lead_id })
            .await?
            .ok_or_else(|| LeadhubError::NotFound("Lead".into()))?;

        if lead.partner != caller {
            return Err(LeadhubError::Forbidden(
                "You are not authorized to add a note to this lead".into(),
            ));
        }

        self.leads
            .find_one_and_update(doc! { "_id": lead_id }, doc! { "$set": { "note": note } })
            .await?
            .ok_or_else(|| LeadhubError::NotFound("Lead".into()))
    }

    /// Leads assigned to the calling partner, optionally filtered by status
    pub async fn partner_leads(
        &self,
        caller: ObjectId,
        status: Option<LeadStatus>,
    ) -> Result<Vec<LeadView>> {
        let leads = self
            .leads
            .find_many(scoped_filter("partner", caller, status))
            .await?;
        self.attach_summaries(leads, false).await
    }

    /// Leads created by the calling user, optionally filtered by status
    pub async fn user_leads(
        &self,
        caller: ObjectId,
        status: Option<LeadStatus>,
    ) -> Result<Vec<LeadView>> {
        let leads = self
            .leads
            .find_many(scoped_filter("user", caller, status))
            .await?;
        self.attach_summaries(leads, false).await
    }

    /// Single lead with service, location, and user summaries attached
    pub async fn lead_by_id(&self, lead_id: ObjectId) -> Result<LeadView> {
        let lead = self
            .leads
            .find_one(doc! { "_id": lead_id })
            .await?
            .ok_or_else(|| LeadhubError::NotFound("Lead".into()))?;

        let mut views = self.attach_summaries(vec![lead], true).await?;
        views
            .pop()
            .ok_or_else(|| LeadhubError::Database("Lead view projection failed".into()))
    }

    /// Batch-load the referenced services/locations/users and attach their
    /// summary fields to each lead.
    async fn attach_summaries(
        &self,
        leads: Vec<LeadDoc>,
        include_user: bool,
    ) -> Result<Vec<LeadView>> {
        if leads.is_empty() {
            return Ok(Vec::new());
        }

        let service_ids: Vec<ObjectId> = leads.iter().map(|l| l.service).collect();
        let location_ids: Vec<ObjectId> = leads.iter().map(|l| l.location).collect();

        let services: HashMap<ObjectId, ServiceSummary> = self
            .services
            .find_many(doc! { "_id": { "$in": service_ids } })
            .await?
            .into_iter()
            .filter_map(|s| s._id.map(|id| (id, s.summary())))
            .collect();

        let locations: HashMap<ObjectId, LocationSummary> = self
            .locations
            .find_many(doc! { "_id": { "$in": location_ids } })
            .await?
            .into_iter()
            .filter_map(|l| l._id.map(|id| (id, l.summary())))
            .collect();

        let users: HashMap<ObjectId, UserSummary> = if include_user {
            let user_ids: Vec<ObjectId> = leads.iter().map(|l| l.user).collect();
            self.users
                .find_many(doc! { "_id": { "$in": user_ids } })
                .await?
                .into_iter()
                .filter_map(|u| u._id.map(|id| (id, u.summary())))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(leads
            .into_iter()
            .map(|lead| LeadView {
                service: services.get(&lead.service).cloned(),
                location: locations.get(&lead.location).cloned(),
                user: users.get(&lead.user).cloned(),
                lead,
            })
            .collect())
    }
}

/// Refuse creation when the requester owns the inquired service; a partner
/// cannot file a lead against themselves.
fn ensure_not_self_inquiry(owner: ObjectId, caller: ObjectId) -> Result<()> {
    if owner == caller {
        return Err(LeadhubError::Forbidden(
            "Cannot make an inquiry about your own service".into(),
        ));
    }
    Ok(())
}

/// Resolve the caller's role relative to a lead.
///
/// The auth layer should never route a third party here, but the manager
/// still refuses anyone who is neither party.
fn resolve_role(lead: &LeadDoc, caller: ObjectId) -> Result<LeadRole> {
    if lead.partner == caller {
        Ok(LeadRole::Partner)
    } else if lead.user == caller {
        Ok(LeadRole::User)
    } else {
        Err(LeadhubError::Forbidden(
            "You are not a party to this lead".into(),
        ))
    }
}

/// Filter for a role-scoped lead query with an optional status filter
fn scoped_filter(owner_field: &str, owner: ObjectId, status: Option<LeadStatus>) -> Document {
    let mut filter = doc! { owner_field: owner };
    if let Some(status) = status {
        filter.insert("status", status.as_str());
    }
    filter
}

/// `$set` document for a planned transition; writes exactly the fields the
/// matched table row specifies and nothing else.
fn transition_set(effect: &TransitionEffect) -> Document {
    let mut set = doc! { "status": effect.status.as_str() };
    if let Some(reason) = effect.reason {
        set.insert("reason", reason);
    }
    if let Some(offer) = &effect.offer {
        set.insert("offer", offer);
    }
    if effect.stamp_completed {
        set.insert("date_completed", DateTime::now());
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::transition::REASON_AWAITING_REVIEW;

    fn lead_between(user: ObjectId, partner: ObjectId) -> LeadDoc {
        LeadDoc {
            user,
            partner,
            ..Default::default()
        }
    }

    #[test]
    fn test_service_owner_cannot_inquire_about_own_service() {
        let owner = ObjectId::new();

        let err = ensure_not_self_inquiry(owner, owner).unwrap_err();
        assert!(matches!(err, LeadhubError::Forbidden(_)));
        assert_eq!(
            err.to_string(),
            "Cannot make an inquiry about your own service"
        );

        let stranger = ObjectId::new();
        assert!(ensure_not_self_inquiry(owner, stranger).is_ok());
    }

    #[test]
    fn test_resolve_role() {
        let user = ObjectId::new();
        let partner = ObjectId::new();
        let lead = lead_between(user, partner);

        assert_eq!(resolve_role(&lead, partner).unwrap(), LeadRole::Partner);
        assert_eq!(resolve_role(&lead, user).unwrap(), LeadRole::User);

        let stranger = ObjectId::new();
        assert!(matches!(
            resolve_role(&lead, stranger),
            Err(LeadhubError::Forbidden(_))
        ));
    }

    #[test]
    fn test_scoped_filter_with_and_without_status() {
        let owner = ObjectId::new();

        let filter = scoped_filter("partner", owner, None);
        assert_eq!(filter.get_object_id("partner").unwrap(), owner);
        assert!(!filter.contains_key("status"));

        let filter = scoped_filter("user", owner, Some(LeadStatus::Active));
        assert_eq!(filter.get_str("status").unwrap(), "Active");
    }

    #[test]
    fn test_transition_set_writes_only_matched_fields() {
        let effect = TransitionEffect {
            status: LeadStatus::Active,
            reason: None,
            offer: None,
            stamp_completed: false,
        };
        let set = transition_set(&effect);
        assert_eq!(set.get_str("status").unwrap(), "Active");
        assert!(!set.contains_key("reason"));
        assert!(!set.contains_key("offer"));
        assert!(!set.contains_key("date_completed"));
    }

    #[test]
    fn test_transition_set_stamps_completion() {
        let effect = TransitionEffect {
            status: LeadStatus::Complete,
            reason: Some(REASON_AWAITING_REVIEW),
            offer: None,
            stamp_completed: true,
        };
        let set = transition_set(&effect);
        assert_eq!(set.get_str("status").unwrap(), "Complete");
        assert_eq!(set.get_str("reason").unwrap(), REASON_AWAITING_REVIEW);
        assert!(set.get_datetime("date_completed").is_ok());
    }

    #[test]
    fn test_transition_set_carries_offer() {
        let effect = TransitionEffect {
            status: LeadStatus::Active,
            reason: None,
            offer: Some("150".into()),
            stamp_completed: false,
        };
        let set = transition_set(&effect);
        assert_eq!(set.get_str("offer").unwrap(), "150");
    }
}
