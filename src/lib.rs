//! Meeting Lifecycle Service
//!
//! Manages the full lifecycle of recurring meetings against an external
//! conferencing provider: recurrence expansion, per-occurrence RSVP
//! resolution, optimistic concurrency over meeting records, and
//! reconciliation of the provider's webhook event stream into
//! past-meeting records with sessions, participants and artifacts.
//!
//! # Modules
//!
//! - `services`: recurrence expansion, occurrence/RSVP state, webhook
//!   reconciliation and the lifecycle orchestrator
//! - `client`: ConferencingProvider trait and its HTTP implementation
//! - `auth`: request signing for the provider API and webhook
//!   signature verification
//!
//! # Authentication
//!
//! Outbound provider calls are signed with HMAC-SHA256 over the request
//! line, headers and body. Inbound webhook deliveries are verified with
//! the provider's `v0={hex}` signature scheme over the raw body before
//! any event is interpreted.

pub mod auth;
pub mod client;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub mod client_mock;

// Re-export the main API types for ease of use
pub use auth::{ProviderAuth, WebhookAuth};
pub use client::{ConferencingProvider, ProviderHttpClient};
pub use errors::ServiceError;
pub use handlers::api::AppState;
pub use routes::create_router;
