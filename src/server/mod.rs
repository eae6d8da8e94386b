//! HTTP server for Leadhub

pub mod http;

pub use http::{run, AppState};
