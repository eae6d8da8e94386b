//! The lead lifecycle transition table
//!
//! `Pending -> {Pool, Active, Complete}`, `Pool -> {Active, Complete}`,
//! `Active -> {Complete}`, `Complete` terminal. Every transition is gated by
//! the caller's role relative to the lead and, for declining/terminal moves,
//! an exact reason string. Planning is pure: it computes the effect or
//! rejects, and never touches storage.

use std::fmt;
use thiserror::Error;

use crate::db::schemas::LeadStatus;

/// Reason the user gives when withdrawing a pending inquiry
pub const REASON_USER_DELETED: &str = "User Deleted";
/// Reason the partner gives when declining an inquiry
pub const REASON_LOCATION_DECLINED: &str = "Location Declined";
/// Reason the user gives when declining a pooled lead
pub const REASON_USER_DECLINE: &str = "User Decline";
/// Reason the partner gives when completing an active lead
pub const REASON_AWAITING_REVIEW: &str = "Awaiting Customer Review";

/// The caller's role relative to the lead being updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadRole {
    /// Caller is the lead's inquiring user
    User,
    /// Caller is the lead's assigned partner
    Partner,
}

impl fmt::Display for LeadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadRole::User => f.write_str("user"),
            LeadRole::Partner => f.write_str("partner"),
        }
    }
}

/// A requested transition as received from the API
#[derive(Debug, Clone, Copy)]
pub struct TransitionRequest<'a> {
    pub status: LeadStatus,
    pub reason: Option<&'a str>,
    pub offer: Option<&'a str>,
}

/// The exact fields a successful transition writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEffect {
    pub status: LeadStatus,
    /// Reason string to set, when the matched row requires one
    pub reason: Option<&'static str>,
    /// Offer to set (Pool -> Active by the user only)
    pub offer: Option<String>,
    /// Whether `date_completed` is stamped with the commit time
    pub stamp_completed: bool,
}

impl TransitionEffect {
    fn to_status(status: LeadStatus) -> Self {
        Self {
            status,
            reason: None,
            offer: None,
            stamp_completed: false,
        }
    }

    fn complete_with(reason: &'static str) -> Self {
        Self {
            status: LeadStatus::Complete,
            reason: Some(reason),
            offer: None,
            stamp_completed: false,
        }
    }
}

/// Rejection of a transition request; planning leaves the lead untouched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Lead is already complete and cannot be updated")]
    AlreadyComplete,

    #[error("User cannot update an Active lead")]
    UserOnActive,

    #[error("Invalid action for {role} on {current} lead")]
    InvalidAction { role: LeadRole, current: LeadStatus },
}

/// Plan a transition against the legal-transition table.
///
/// Matches on `(current status, caller role, requested status)` with guards
/// for the required companion fields. Any combination outside the table is
/// rejected with a message naming the caller role and current status.
pub fn plan(
    current: LeadStatus,
    role: LeadRole,
    request: &TransitionRequest<'_>,
) -> Result<TransitionEffect, TransitionError> {
    use LeadRole::{Partner, User};
    use LeadStatus::{Active, Complete, Pending, Pool};

    match (current, role, request.status) {
        // Complete is absorbing regardless of role or requested status
        (Complete, _, _) => Err(TransitionError::AlreadyComplete),

        // User withdraws a pending inquiry
        (Pending, User, Complete) if request.reason == Some(REASON_USER_DELETED) => {
            Ok(TransitionEffect::complete_with(REASON_USER_DELETED))
        }
        (Pending, User, _) => Err(TransitionError::InvalidAction {
            role: User,
            current: Pending,
        }),

        // Partner approves a pending inquiry
        (Pending, Partner, Active) if request.reason.is_none() => {
            Ok(TransitionEffect::to_status(Active))
        }
        // Partner declines a pending inquiry
        (Pending, Partner, Complete) if request.reason == Some(REASON_LOCATION_DECLINED) => {
            Ok(TransitionEffect::complete_with(REASON_LOCATION_DECLINED))
        }
        (Pending, Partner, _) => Err(TransitionError::InvalidAction {
            role: Partner,
            current: Pending,
        }),

        // User accepts a pooled lead with a counter-offer
        (Pool, User, Active)
            if request.reason.is_none() && request.offer.is_some_and(|o| !o.is_empty()) =>
        {
            Ok(TransitionEffect {
                status: Active,
                reason: None,
                offer: request.offer.map(str::to_string),
                stamp_completed: false,
            })
        }
        // User declines a pooled lead
        (Pool, User, Complete) if request.reason == Some(REASON_USER_DECLINE) => {
            Ok(TransitionEffect::complete_with(REASON_USER_DECLINE))
        }
        (Pool, User, _) => Err(TransitionError::InvalidAction {
            role: User,
            current: Pool,
        }),

        // Partner declines a pooled lead
        (Pool, Partner, Complete) if request.reason == Some(REASON_LOCATION_DECLINED) => {
            Ok(TransitionEffect::complete_with(REASON_LOCATION_DECLINED))
        }
        (Pool, Partner, _) => Err(TransitionError::InvalidAction {
            role: Partner,
            current: Pool,
        }),

        // Active leads belong to the partner
        (Active, User, _) => Err(TransitionError::UserOnActive),

        // Partner completes the work
        (Active, Partner, Complete) if request.reason == Some(REASON_AWAITING_REVIEW) => {
            Ok(TransitionEffect {
                status: Complete,
                reason: Some(REASON_AWAITING_REVIEW),
                offer: None,
                stamp_completed: true,
            })
        }
        (Active, Partner, _) => Err(TransitionError::InvalidAction {
            role: Partner,
            current: Active,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LeadRole::{Partner, User};
    use LeadStatus::{Active, Complete, Pending, Pool};

    fn request(status: LeadStatus) -> TransitionRequest<'static> {
        TransitionRequest {
            status,
            reason: None,
            offer: None,
        }
    }

    fn request_with_reason(status: LeadStatus, reason: &'static str) -> TransitionRequest<'static> {
        TransitionRequest {
            status,
            reason: Some(reason),
            offer: None,
        }
    }

    #[test]
    fn test_partner_approves_pending_lead() {
        let effect = plan(Pending, Partner, &request(Active)).unwrap();
        assert_eq!(effect.status, Active);
        assert_eq!(effect.reason, None);
        assert_eq!(effect.offer, None);
        assert!(!effect.stamp_completed);
    }

    #[test]
    fn test_partner_approval_rejects_stray_reason() {
        // A reason on the approval row means the request doesn't match the table
        let err = plan(
            Pending,
            Partner,
            &request_with_reason(Active, "Location Declined"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidAction {
                role: Partner,
                current: Pending
            }
        );
    }

    #[test]
    fn test_user_withdraws_pending_lead() {
        let effect = plan(Pending, User, &request_with_reason(Complete, REASON_USER_DELETED)).unwrap();
        assert_eq!(effect.status, Complete);
        assert_eq!(effect.reason, Some(REASON_USER_DELETED));
        assert!(!effect.stamp_completed);
    }

    #[test]
    fn test_user_withdrawal_requires_exact_reason() {
        // A mismatched reason is rejected, not silently corrected
        let err = plan(Pending, User, &request_with_reason(Complete, "user deleted")).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidAction {
                role: User,
                current: Pending
            }
        );

        let err = plan(Pending, User, &request(Complete)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidAction {
                role: User,
                current: Pending
            }
        );
    }

    #[test]
    fn test_user_cannot_approve_pending_lead() {
        let err = plan(Pending, User, &request(Active)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidAction {
                role: User,
                current: Pending
            }
        );
    }

    #[test]
    fn test_partner_declines_pending_lead() {
        let effect = plan(
            Pending,
            Partner,
            &request_with_reason(Complete, REASON_LOCATION_DECLINED),
        )
        .unwrap();
        assert_eq!(effect.status, Complete);
        assert_eq!(effect.reason, Some(REASON_LOCATION_DECLINED));
    }

    #[test]
    fn test_user_accepts_pooled_lead_with_offer() {
        let req = TransitionRequest {
            status: Active,
            reason: None,
            offer: Some("150"),
        };
        let effect = plan(Pool, User, &req).unwrap();
        assert_eq!(effect.status, Active);
        assert_eq!(effect.offer.as_deref(), Some("150"));
        assert_eq!(effect.reason, None);
    }

    #[test]
    fn test_pool_acceptance_requires_offer() {
        let err = plan(Pool, User, &request(Active)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidAction {
                role: User,
                current: Pool
            }
        );

        // An empty offer is as good as none
        let req = TransitionRequest {
            status: Active,
            reason: None,
            offer: Some(""),
        };
        assert!(plan(Pool, User, &req).is_err());
    }

    #[test]
    fn test_user_declines_pooled_lead() {
        let effect = plan(Pool, User, &request_with_reason(Complete, REASON_USER_DECLINE)).unwrap();
        assert_eq!(effect.status, Complete);
        assert_eq!(effect.reason, Some(REASON_USER_DECLINE));
    }

    #[test]
    fn test_partner_declines_pooled_lead() {
        let effect = plan(
            Pool,
            Partner,
            &request_with_reason(Complete, REASON_LOCATION_DECLINED),
        )
        .unwrap();
        assert_eq!(effect.status, Complete);
        assert_eq!(effect.reason, Some(REASON_LOCATION_DECLINED));
    }

    #[test]
    fn test_partner_cannot_activate_pooled_lead() {
        let err = plan(Pool, Partner, &request(Active)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidAction {
                role: Partner,
                current: Pool
            }
        );
    }

    #[test]
    fn test_user_cannot_touch_active_lead() {
        for status in [Pending, Pool, Active, Complete] {
            let err = plan(Active, User, &request(status)).unwrap_err();
            assert_eq!(err, TransitionError::UserOnActive);
        }
        // Even with a plausible reason attached
        let err = plan(Active, User, &request_with_reason(Complete, REASON_USER_DECLINE)).unwrap_err();
        assert_eq!(err, TransitionError::UserOnActive);
    }

    #[test]
    fn test_partner_completes_active_lead() {
        let effect = plan(
            Active,
            Partner,
            &request_with_reason(Complete, REASON_AWAITING_REVIEW),
        )
        .unwrap();
        assert_eq!(effect.status, Complete);
        assert_eq!(effect.reason, Some(REASON_AWAITING_REVIEW));
        assert!(effect.stamp_completed);
    }

    #[test]
    fn test_partner_completion_requires_review_reason() {
        let err = plan(Active, Partner, &request(Complete)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidAction {
                role: Partner,
                current: Active
            }
        );
    }

    #[test]
    fn test_complete_is_absorbing() {
        for role in [User, Partner] {
            for status in [Pending, Pool, Active, Complete] {
                let err = plan(Complete, role, &request(status)).unwrap_err();
                assert_eq!(err, TransitionError::AlreadyComplete);
            }
        }
        // Reasons don't reopen a completed lead either
        let err = plan(
            Complete,
            Partner,
            &request_with_reason(Active, REASON_AWAITING_REVIEW),
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::AlreadyComplete);
    }

    #[test]
    fn test_rejection_is_idempotent() {
        // Planning is pure: the same illegal request yields the same error
        let first = plan(Pool, Partner, &request(Active)).unwrap_err();
        let second = plan(Pool, Partner, &request(Active)).unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejection_messages_name_role_and_status() {
        let err = plan(Pool, Partner, &request(Active)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid action for partner on Pool lead");

        let err = plan(Active, User, &request(Complete)).unwrap_err();
        assert_eq!(err.to_string(), "User cannot update an Active lead");

        let err = plan(Complete, User, &request(Active)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Lead is already complete and cannot be updated"
        );
    }
}
