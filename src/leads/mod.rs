//! Lead lifecycle
//!
//! `transition` is the pure legal-transition table; `service` applies it
//! against storage and owns creation, notes, and the role-scoped queries.

pub mod service;
pub mod transition;

pub use service::{CreateLeadInput, LeadService, LeadView, StatusChange};
pub use transition::{LeadRole, TransitionEffect, TransitionRequest};
