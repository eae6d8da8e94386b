//! Leadhub - REST backend for the marketplace lead lifecycle
//!
//! Leadhub connects end users with service providers ("partners"). A lead is
//! a customer inquiry about a partner's service; it moves through a fixed
//! lifecycle (`Pending -> Pool -> Active -> Complete`) governed by a
//! role-gated transition table.
//!
//! ## Services
//!
//! - **Leads**: creation, status transitions, partner notes, role-scoped queries
//! - **Auth**: JWT credentials for users and partners
//! - **Media**: upload of inquiry photos/videos to external storage
//! - **Conversations**: messaging threads created alongside each lead

pub mod auth;
pub mod config;
pub mod db;
pub mod leads;
pub mod media;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{LeadhubError, Result};
