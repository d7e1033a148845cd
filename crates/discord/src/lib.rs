//! Discord Integration - interaction intake and dispatch protocol
//!
//! This crate provides the Discord-facing protocol pieces for herald:
//! - **Signature verification** (`verify`) - Ed25519 request authentication
//! - **Payload decoding** (`interaction`) - wire payload to [`Interaction`]
//! - **Command registry** (`registry`) - immutable name-to-handler mapping
//! - **Dispatch** (`dispatch`) - bounded handler execution with uniform
//!   success/error envelopes
//! - **Response delivery** (`responder`) - the single follow-up webhook call
//! - **Catalog sync** (`catalog`) - bulk slash-command registration, global
//!   or per-guild
//!
//! # Architecture
//!
//! ```text
//! Signed request → Verifier → Decoder → Dispatcher → Responder → Discord
//!                                          ↓
//!                                 CommandRegistry (read-only)
//! ```
//!
//! # Key Types
//!
//! - `SignatureVerifier` - checks `timestamp || body` against the app key
//! - `CommandRegistry` - built once at startup, duplicate names rejected
//! - `Dispatcher` - always yields a deliverable [`ResponseEnvelope`]
//! - `WebhookResponder` - PATCHes the interaction's callback endpoint
//!
//! [`Interaction`]: herald_core::Interaction
//! [`ResponseEnvelope`]: herald_core::ResponseEnvelope

pub mod catalog;
pub mod dispatch;
pub mod handlers;
pub mod interaction;
pub mod registry;
pub mod responder;
pub mod verify;
