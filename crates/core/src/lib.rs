//! Shared foundation for the herald workspace: configuration loading, the
//! interaction data model, the response envelope, and the ingress-facing
//! error taxonomy.

pub mod config;
pub mod envelope;
pub mod errors;
pub mod interaction;

pub use envelope::ResponseEnvelope;
pub use errors::IngressError;
pub use interaction::{DeliveryTarget, Interaction, InteractionKind};
